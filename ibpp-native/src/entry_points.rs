//! Entry points of the fbclient library, resolved by name

#![allow(non_snake_case)]

use std::{
    ffi::CString,
    mem,
    os::raw::{c_char, c_int, c_short, c_void},
    path::{Path, PathBuf},
    ptr,
};

use ibpp_core::{ibase::*, FbClient, FbError, Status, XSqlDa};

use crate::loader::SymbolSource;

/// Declares the table of entry points and its resolution
macro_rules! entry_points {
    ( $( fn $name:ident ( $( $arg:ty ),* ) -> $ret:ty; )* ) => {
        /// Function pointers to the client library
        pub struct EntryPoints {
            $( pub $name: unsafe extern "C" fn( $( $arg ),* ) -> $ret, )*
        }

        impl EntryPoints {
            /// Binds every entry point, failing on the first missing one
            pub fn resolve<S: SymbolSource + ?Sized>(source: &S) -> Result<Self, FbError> {
                Ok(EntryPoints {
                    $(
                        $name: unsafe {
                            let address = source.symbol(stringify!($name)).ok_or_else(|| {
                                FbError::logic(
                                    "GDS::Call",
                                    format!(
                                        "Entry point {} not found in the client library",
                                        stringify!($name)
                                    ),
                                )
                            })?;

                            mem::transmute::<*const c_void, unsafe extern "C" fn( $( $arg ),* ) -> $ret>(address)
                        },
                    )*
                })
            }

            /// Names of all the entry points
            pub fn names() -> &'static [&'static str] {
                &[ $( stringify!($name), )* ]
            }
        }
    };
}

entry_points! {
    fn isc_attach_database(*mut ISC_STATUS, c_short, *const c_char, *mut isc_db_handle, c_short, *const c_char) -> ISC_STATUS;
    fn isc_detach_database(*mut ISC_STATUS, *mut isc_db_handle) -> ISC_STATUS;
    fn isc_drop_database(*mut ISC_STATUS, *mut isc_db_handle) -> ISC_STATUS;
    fn isc_database_info(*mut ISC_STATUS, *mut isc_db_handle, c_short, *const c_char, c_short, *mut c_char) -> ISC_STATUS;
    fn isc_dsql_execute_immediate(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, u16, *const c_char, u16, *const XSQLDA) -> ISC_STATUS;
    fn isc_start_multiple(*mut ISC_STATUS, *mut isc_tr_handle, c_short, *mut c_void) -> ISC_STATUS;
    fn isc_commit_transaction(*mut ISC_STATUS, *mut isc_tr_handle) -> ISC_STATUS;
    fn isc_commit_retaining(*mut ISC_STATUS, *mut isc_tr_handle) -> ISC_STATUS;
    fn isc_rollback_transaction(*mut ISC_STATUS, *mut isc_tr_handle) -> ISC_STATUS;
    fn isc_rollback_retaining(*mut ISC_STATUS, *mut isc_tr_handle) -> ISC_STATUS;
    fn isc_dsql_allocate_statement(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_stmt_handle) -> ISC_STATUS;
    fn isc_dsql_prepare(*mut ISC_STATUS, *mut isc_tr_handle, *mut isc_stmt_handle, u16, *const c_char, u16, *mut XSQLDA) -> ISC_STATUS;
    fn isc_dsql_describe(*mut ISC_STATUS, *mut isc_stmt_handle, u16, *mut XSQLDA) -> ISC_STATUS;
    fn isc_dsql_describe_bind(*mut ISC_STATUS, *mut isc_stmt_handle, u16, *mut XSQLDA) -> ISC_STATUS;
    fn isc_dsql_execute(*mut ISC_STATUS, *mut isc_tr_handle, *mut isc_stmt_handle, u16, *const XSQLDA) -> ISC_STATUS;
    fn isc_dsql_execute2(*mut ISC_STATUS, *mut isc_tr_handle, *mut isc_stmt_handle, u16, *const XSQLDA, *const XSQLDA) -> ISC_STATUS;
    fn isc_dsql_fetch(*mut ISC_STATUS, *mut isc_stmt_handle, u16, *const XSQLDA) -> ISC_STATUS;
    fn isc_dsql_free_statement(*mut ISC_STATUS, *mut isc_stmt_handle, u16) -> ISC_STATUS;
    fn isc_dsql_set_cursor_name(*mut ISC_STATUS, *mut isc_stmt_handle, *const c_char, u16) -> ISC_STATUS;
    fn isc_dsql_sql_info(*mut ISC_STATUS, *mut isc_stmt_handle, c_short, *const c_char, c_short, *mut c_char) -> ISC_STATUS;
    fn isc_create_blob2(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, *mut isc_blob_handle, *mut ISC_QUAD, c_short, *const c_char) -> ISC_STATUS;
    fn isc_open_blob2(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, *mut isc_blob_handle, *mut ISC_QUAD, u16, *const u8) -> ISC_STATUS;
    fn isc_close_blob(*mut ISC_STATUS, *mut isc_blob_handle) -> ISC_STATUS;
    fn isc_cancel_blob(*mut ISC_STATUS, *mut isc_blob_handle) -> ISC_STATUS;
    fn isc_get_segment(*mut ISC_STATUS, *mut isc_blob_handle, *mut u16, u16, *mut c_char) -> ISC_STATUS;
    fn isc_put_segment(*mut ISC_STATUS, *mut isc_blob_handle, u16, *const c_char) -> ISC_STATUS;
    fn isc_blob_info(*mut ISC_STATUS, *mut isc_blob_handle, c_short, *const c_char, c_short, *mut c_char) -> ISC_STATUS;
    fn isc_array_lookup_bounds(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, *const c_char, *const c_char, *mut ISC_ARRAY_DESC) -> ISC_STATUS;
    fn isc_array_get_slice(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, *mut ISC_QUAD, *const ISC_ARRAY_DESC, *mut c_void, *mut ISC_LONG) -> ISC_STATUS;
    fn isc_array_put_slice(*mut ISC_STATUS, *mut isc_db_handle, *mut isc_tr_handle, *mut ISC_QUAD, *const ISC_ARRAY_DESC, *mut c_void, *mut ISC_LONG) -> ISC_STATUS;
    fn isc_que_events(*mut ISC_STATUS, *mut isc_db_handle, *mut ISC_LONG, c_short, *const u8, ISC_EVENT_CALLBACK, *mut c_void) -> ISC_STATUS;
    fn isc_cancel_events(*mut ISC_STATUS, *mut isc_db_handle, *mut ISC_LONG) -> ISC_STATUS;
    fn isc_sqlcode(*const ISC_STATUS) -> ISC_LONG;
    fn isc_sql_interprete(c_short, *mut c_char, c_short) -> ();
    fn fb_interpret(*mut c_char, u32, *mut *const ISC_STATUS) -> ISC_LONG;
    fn isc_get_client_major_version() -> c_int;
    fn isc_get_client_minor_version() -> c_int;
}

/// `FbClient` over a loaded fbclient library
pub struct FbClientLib {
    ep: EntryPoints,
    path: PathBuf,
    // Must outlive the entry points
    _lib: libloading::Library,
}

impl FbClientLib {
    pub(crate) fn from_library(lib: libloading::Library, path: PathBuf) -> Result<Self, FbError> {
        let ep = EntryPoints::resolve(&lib)?;

        Ok(FbClientLib {
            ep,
            path,
            _lib: lib,
        })
    }

    /// Where the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FbClientLib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FbClientLib")
            .field("path", &self.path)
            .finish()
    }
}

/// Statement lengths are 16 bits wide in the api
fn sql_length(status: &mut Status, sql: &[u8]) -> Option<u16> {
    match u16::try_from(sql.len()) {
        Ok(len) => Some(len),
        Err(_) => {
            status.set_error(isc_dsql_error);
            None
        }
    }
}

fn opt_xsqlda(xsqlda: Option<&mut XSqlDa>) -> *mut XSQLDA {
    xsqlda.map_or(ptr::null_mut(), |x| x.as_mut_ptr())
}

/// Strings passed as C strings can't carry a nul
fn c_string(status: &mut Status, s: &str) -> Option<CString> {
    match CString::new(s) {
        Ok(s) => Some(s),
        Err(_) => {
            status.set_error(isc_dsql_error);
            None
        }
    }
}

impl FbClient for FbClientLib {
    fn attach_database(
        &self,
        status: &mut Status,
        path: &[u8],
        db: &mut isc_db_handle,
        dpb: &[u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_attach_database)(
                status.as_mut_ptr(),
                path.len() as c_short,
                path.as_ptr() as *const c_char,
                db,
                dpb.len() as c_short,
                dpb.as_ptr() as *const c_char,
            )
        }
    }

    fn detach_database(&self, status: &mut Status, db: &mut isc_db_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_detach_database)(status.as_mut_ptr(), db) }
    }

    fn drop_database(&self, status: &mut Status, db: &mut isc_db_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_drop_database)(status.as_mut_ptr(), db) }
    }

    fn database_info(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_database_info)(
                status.as_mut_ptr(),
                db,
                items.len() as c_short,
                items.as_ptr() as *const c_char,
                buffer.len() as c_short,
                buffer.as_mut_ptr() as *mut c_char,
            )
        }
    }

    fn dsql_execute_immediate(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        sql: &[u8],
        dialect: u16,
        xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS {
        let len = match sql_length(status, sql) {
            Some(len) => len,
            None => return isc_dsql_error,
        };

        unsafe {
            (self.ep.isc_dsql_execute_immediate)(
                status.as_mut_ptr(),
                db,
                tr,
                len,
                sql.as_ptr() as *const c_char,
                dialect,
                opt_xsqlda(xsqlda),
            )
        }
    }

    fn start_multiple(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        dbs: &mut [(isc_db_handle, &[u8])],
    ) -> ISC_STATUS {
        let mut teb: Vec<ISC_TEB> = dbs
            .iter_mut()
            .map(|(db, tpb)| ISC_TEB {
                db_ptr: db,
                tpb_len: tpb.len() as c_int,
                tpb_ptr: tpb.as_ptr() as *const c_char,
            })
            .collect();

        unsafe {
            (self.ep.isc_start_multiple)(
                status.as_mut_ptr(),
                tr,
                teb.len() as c_short,
                teb.as_mut_ptr() as *mut c_void,
            )
        }
    }

    fn commit_transaction(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_commit_transaction)(status.as_mut_ptr(), tr) }
    }

    fn commit_retaining(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_commit_retaining)(status.as_mut_ptr(), tr) }
    }

    fn rollback_transaction(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_rollback_transaction)(status.as_mut_ptr(), tr) }
    }

    fn rollback_retaining(&self, status: &mut Status, tr: &mut isc_tr_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_rollback_retaining)(status.as_mut_ptr(), tr) }
    }

    fn dsql_allocate_statement(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        stmt: &mut isc_stmt_handle,
    ) -> ISC_STATUS {
        unsafe { (self.ep.isc_dsql_allocate_statement)(status.as_mut_ptr(), db, stmt) }
    }

    fn dsql_prepare(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        sql: &[u8],
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS {
        let len = match sql_length(status, sql) {
            Some(len) => len,
            None => return isc_dsql_error,
        };

        unsafe {
            (self.ep.isc_dsql_prepare)(
                status.as_mut_ptr(),
                tr,
                stmt,
                len,
                sql.as_ptr() as *const c_char,
                dialect,
                xsqlda.as_mut_ptr(),
            )
        }
    }

    fn dsql_describe(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS {
        unsafe { (self.ep.isc_dsql_describe)(status.as_mut_ptr(), stmt, dialect, xsqlda.as_mut_ptr()) }
    }

    fn dsql_describe_bind(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_dsql_describe_bind)(status.as_mut_ptr(), stmt, dialect, xsqlda.as_mut_ptr())
        }
    }

    fn dsql_execute(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        in_xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_dsql_execute)(status.as_mut_ptr(), tr, stmt, dialect, opt_xsqlda(in_xsqlda))
        }
    }

    fn dsql_execute2(
        &self,
        status: &mut Status,
        tr: &mut isc_tr_handle,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        in_xsqlda: Option<&mut XSqlDa>,
        out_xsqlda: Option<&mut XSqlDa>,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_dsql_execute2)(
                status.as_mut_ptr(),
                tr,
                stmt,
                dialect,
                opt_xsqlda(in_xsqlda),
                opt_xsqlda(out_xsqlda),
            )
        }
    }

    fn dsql_fetch(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        dialect: u16,
        out_xsqlda: &mut XSqlDa,
    ) -> ISC_STATUS {
        unsafe { (self.ep.isc_dsql_fetch)(status.as_mut_ptr(), stmt, dialect, out_xsqlda.as_mut_ptr()) }
    }

    fn dsql_free_statement(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        option: u16,
    ) -> ISC_STATUS {
        unsafe { (self.ep.isc_dsql_free_statement)(status.as_mut_ptr(), stmt, option) }
    }

    fn dsql_set_cursor_name(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        name: &str,
    ) -> ISC_STATUS {
        let name = match c_string(status, name) {
            Some(name) => name,
            None => return isc_dsql_error,
        };

        unsafe { (self.ep.isc_dsql_set_cursor_name)(status.as_mut_ptr(), stmt, name.as_ptr(), 0) }
    }

    fn dsql_sql_info(
        &self,
        status: &mut Status,
        stmt: &mut isc_stmt_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_dsql_sql_info)(
                status.as_mut_ptr(),
                stmt,
                items.len() as c_short,
                items.as_ptr() as *const c_char,
                buffer.len() as c_short,
                buffer.as_mut_ptr() as *mut c_char,
            )
        }
    }

    fn create_blob2(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        blob: &mut isc_blob_handle,
        id: &mut ISC_QUAD,
        bpb: &[u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_create_blob2)(
                status.as_mut_ptr(),
                db,
                tr,
                blob,
                id,
                bpb.len() as c_short,
                if bpb.is_empty() { ptr::null() } else { bpb.as_ptr() as *const c_char },
            )
        }
    }

    fn open_blob2(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        blob: &mut isc_blob_handle,
        id: &mut ISC_QUAD,
        bpb: &[u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_open_blob2)(
                status.as_mut_ptr(),
                db,
                tr,
                blob,
                id,
                bpb.len() as u16,
                if bpb.is_empty() { ptr::null() } else { bpb.as_ptr() },
            )
        }
    }

    fn close_blob(&self, status: &mut Status, blob: &mut isc_blob_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_close_blob)(status.as_mut_ptr(), blob) }
    }

    fn cancel_blob(&self, status: &mut Status, blob: &mut isc_blob_handle) -> ISC_STATUS {
        unsafe { (self.ep.isc_cancel_blob)(status.as_mut_ptr(), blob) }
    }

    fn get_segment(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        actual: &mut u16,
        buffer: &mut [u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_get_segment)(
                status.as_mut_ptr(),
                blob,
                actual,
                buffer.len().min(u16::MAX as usize) as u16,
                buffer.as_mut_ptr() as *mut c_char,
            )
        }
    }

    fn put_segment(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        data: &[u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_put_segment)(
                status.as_mut_ptr(),
                blob,
                data.len() as u16,
                data.as_ptr() as *const c_char,
            )
        }
    }

    fn blob_info(
        &self,
        status: &mut Status,
        blob: &mut isc_blob_handle,
        items: &[u8],
        buffer: &mut [u8],
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_blob_info)(
                status.as_mut_ptr(),
                blob,
                items.len() as c_short,
                items.as_ptr() as *const c_char,
                buffer.len() as c_short,
                buffer.as_mut_ptr() as *mut c_char,
            )
        }
    }

    fn array_lookup_bounds(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        table: &str,
        column: &str,
        desc: &mut ISC_ARRAY_DESC,
    ) -> ISC_STATUS {
        let (table, column) = match (c_string(status, table), c_string(status, column)) {
            (Some(t), Some(c)) => (t, c),
            _ => return isc_dsql_error,
        };

        unsafe {
            (self.ep.isc_array_lookup_bounds)(
                status.as_mut_ptr(),
                db,
                tr,
                table.as_ptr(),
                column.as_ptr(),
                desc,
            )
        }
    }

    fn array_get_slice(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        id: &mut ISC_QUAD,
        desc: &ISC_ARRAY_DESC,
        buffer: &mut [u8],
        len: &mut ISC_LONG,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_array_get_slice)(
                status.as_mut_ptr(),
                db,
                tr,
                id,
                desc,
                buffer.as_mut_ptr() as *mut c_void,
                len,
            )
        }
    }

    fn array_put_slice(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        tr: &mut isc_tr_handle,
        id: &mut ISC_QUAD,
        desc: &ISC_ARRAY_DESC,
        buffer: &mut [u8],
        len: &mut ISC_LONG,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_array_put_slice)(
                status.as_mut_ptr(),
                db,
                tr,
                id,
                desc,
                buffer.as_mut_ptr() as *mut c_void,
                len,
            )
        }
    }

    fn que_events(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        id: &mut ISC_LONG,
        epb: &[u8],
        callback: ISC_EVENT_CALLBACK,
        arg: *mut c_void,
    ) -> ISC_STATUS {
        unsafe {
            (self.ep.isc_que_events)(
                status.as_mut_ptr(),
                db,
                id,
                epb.len() as c_short,
                epb.as_ptr(),
                callback,
                arg,
            )
        }
    }

    fn cancel_events(
        &self,
        status: &mut Status,
        db: &mut isc_db_handle,
        id: &mut ISC_LONG,
    ) -> ISC_STATUS {
        unsafe { (self.ep.isc_cancel_events)(status.as_mut_ptr(), db, id) }
    }

    fn sqlcode(&self, status: &Status) -> i32 {
        unsafe { (self.ep.isc_sqlcode)(status.as_ptr()) }
    }

    fn sql_interprete(&self, sqlcode: i16, buffer: &mut [u8]) -> usize {
        if buffer.is_empty() {
            return 0;
        }

        unsafe {
            (self.ep.isc_sql_interprete)(
                sqlcode,
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len().min(i16::MAX as usize) as c_short,
            )
        };

        buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len())
    }

    fn interpret(&self, buffer: &mut [u8], status: &Status, position: &mut usize) -> usize {
        if *position >= status.len() {
            return 0;
        }

        let base = status.as_ptr();
        let len = unsafe {
            let mut vector = base.add(*position);
            let len = (self.ep.fb_interpret)(
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len() as u32,
                &mut vector,
            );
            *position = vector.offset_from(base).max(0) as usize;
            len
        };

        (len.max(0) as usize).min(buffer.len())
    }

    fn client_major_version(&self) -> i32 {
        unsafe { (self.ep.isc_get_client_major_version)() }
    }

    fn client_minor_version(&self) -> i32 {
        unsafe { (self.ep.isc_get_client_minor_version)() }
    }
}
