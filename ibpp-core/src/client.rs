//! The seam between the object model and the fbclient library
//!
//! One method per entry point of the C api. Buffers are passed as
//! slices and handles as `&mut`, so an in-memory engine can implement
//! this trait without any unsafe code on its side of the calls that
//! don't involve a descriptor area.

use std::os::raw::c_void;

use crate::{ibase::*, status::Status, xsqlda::XSqlDa};

pub trait FbClient: Send + Sync {
    fn attach_database(
        &self,
        status: &mut Status,
        path: &[u8],
        db: &mut isc_db_handle,
        dpb: &[u8],
    ) -> ISC_STATUS;

    fn detach_database(&self, status: &mut Status, db: &mut isc_db_handle) -> ISC_STATUS;

    fn drop_database(&self, status: &mut Status, db: &mut isc_db_handle) -> ISC_STATUS;

    fn database_info(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS;

    fn dsql_execute_immediate(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        sql: &[u8],
        dialect: u16,
        xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS;

    /// Starts one transaction over every `(database handle, tpb)` pair
    fn start_multiple(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        dbs: &mut [(isc_db_handle, &[u8])],
    ) -> ISC_STATUS;

    fn commit_transaction(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS;

    fn commit_retaining(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS;

    fn rollback_transaction(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS;

    fn rollback_retaining(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS;

    fn dsql_allocate_statement(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        stmt: &mut isc_stmt_handle,
    ) -> ISC_STATUS;

    fn dsql_prepare(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        sql: &[u8],
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS;

    fn dsql_describe(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS;

    fn dsql_describe_bind(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS;

    fn dsql_execute(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        in_xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS;

    fn dsql_execute2(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        in_xsqlda: Option<&mut XSqlDa>,
        out_xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS;

    /// Returns `FETCH_NO_MORE_ROWS` when the cursor is exhausted
    fn dsql_fetch(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        out_xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS;

    fn dsql_free_statement(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        option: u16,
    ) -> ISC_STATUS;

    fn dsql_set_cursor_name(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        name: &str,
    ) -> ISC_STATUS;

    fn dsql_sql_info(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS;

    fn create_blob2(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        blob: &mut isc_blob_handle,
        id: &mut ISC_QUAD,
        bpb: &[u8],
    ) -> ISC_STATUS;

    fn open_blob2(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        blob: &mut isc_blob_handle,
        id: &mut ISC_QUAD,
        bpb: &[u8],
    ) -> ISC_STATUS;

    fn close_blob(&self, status: &mut Status, blob: &mut isc_blob_handle) -> ISC_STATUS;

    fn cancel_blob(&self, status: &mut Status, blob: &mut isc_blob_handle) -> ISC_STATUS;

    /// Returns `isc_segment` for a partial segment and `isc_segstr_eof` at the end
    fn get_segment(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        actual: &mut u16,
        buffer: &mut [u8],
    ) -> ISC_STATUS;

    fn put_segment(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        data: &[u8],
    ) -> ISC_STATUS;

    fn blob_info(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS;

    fn array_lookup_bounds(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        table: &str,
        column: &str,
        desc: &mut ISC_ARRAY_DESC,
    ) -> ISC_STATUS;

    fn array_get_slice(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        id: &mut ISC_QUAD,
        desc: &ISC_ARRAY_DESC,
        buffer: &mut [u8],
        len: &mut ISC_LONG,
    ) -> ISC_STATUS;

    fn array_put_slice(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        id: &mut ISC_QUAD,
        desc: &ISC_ARRAY_DESC,
        buffer: &mut [u8],
        len: &mut ISC_LONG,
    ) -> ISC_STATUS;

    /// Queues an asynchronous wait. The engine calls `callback` with `arg`
    /// on one of its own threads when any event of the `epb` fires
    fn que_events(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        id: &mut ISC_LONG,
        epb: &[u8],
        callback: ISC_EVENT_CALLBACK,
        arg: *mut c_void,
    ) -> ISC_STATUS;

    fn cancel_events(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        id: &mut ISC_LONG,
    ) -> ISC_STATUS;

    /// Sql code embedded in a status vector
    fn sqlcode(&self, status: &Status) -> i32;

    /// Text of a sql code. Returns the written length
    fn sql_interprete(&self, sqlcode: i16, buffer: &mut [u8]) -> usize;

    /// Text of the status vector entry at `position`, advancing it to the
    /// next entry. Returns 0 when there is nothing left
    fn interpret(&self, buffer: &mut [u8], status: &Status, position: &mut usize) -> usize;

    fn client_major_version(&self) -> i32;

    fn client_minor_version(&self) -> i32;
}
