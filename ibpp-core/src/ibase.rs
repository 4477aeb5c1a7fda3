//! Constants and C layouts of the firebird client api (ibase.h)

#![allow(non_upper_case_globals, non_camel_case_types, non_snake_case, dead_code)]

use std::os::raw::{c_char, c_int, c_void};

pub type ISC_STATUS = isize;
pub type ISC_STATUS_ARRAY = [ISC_STATUS; 20];
pub type ISC_LONG = i32;
pub type ISC_ULONG = u32;
pub type ISC_SHORT = i16;
pub type ISC_USHORT = u16;
pub type ISC_SCHAR = c_char;
pub type ISC_UCHAR = u8;
pub type ISC_DATE = i32;
pub type ISC_TIME = u32;

pub type FB_API_HANDLE = u32;
pub type isc_db_handle = FB_API_HANDLE;
pub type isc_tr_handle = FB_API_HANDLE;
pub type isc_stmt_handle = FB_API_HANDLE;
pub type isc_blob_handle = FB_API_HANDLE;

/// Signature of the routine the engine calls when a queued event wait completes
pub type ISC_EVENT_CALLBACK = unsafe extern "C" fn(*mut c_void, ISC_USHORT, *const ISC_UCHAR);

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ISC_QUAD {
    pub gds_quad_high: ISC_LONG,
    pub gds_quad_low: ISC_ULONG,
}

impl ISC_QUAD {
    pub fn is_zero(&self) -> bool {
        self.gds_quad_high == 0 && self.gds_quad_low == 0
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ISC_TIMESTAMP {
    pub timestamp_date: ISC_DATE,
    pub timestamp_time: ISC_TIME,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ISC_ARRAY_BOUND {
    pub array_bound_lower: i16,
    pub array_bound_upper: i16,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ISC_ARRAY_DESC {
    pub array_desc_dtype: ISC_UCHAR,
    pub array_desc_scale: ISC_SCHAR,
    pub array_desc_length: u16,
    pub array_desc_field_name: [ISC_SCHAR; 32],
    pub array_desc_relation_name: [ISC_SCHAR; 32],
    pub array_desc_dimensions: i16,
    pub array_desc_flags: i16,
    pub array_desc_bounds: [ISC_ARRAY_BOUND; 16],
}

impl Default for ISC_ARRAY_DESC {
    fn default() -> Self {
        ISC_ARRAY_DESC {
            array_desc_dtype: 0,
            array_desc_scale: 0,
            array_desc_length: 0,
            array_desc_field_name: [0; 32],
            array_desc_relation_name: [0; 32],
            array_desc_dimensions: 0,
            array_desc_flags: 0,
            array_desc_bounds: [ISC_ARRAY_BOUND::default(); 16],
        }
    }
}

/// One entry of the `isc_start_multiple` vector
#[repr(C)]
pub struct ISC_TEB {
    pub db_ptr: *mut isc_db_handle,
    pub tpb_len: c_int,
    pub tpb_ptr: *const ISC_SCHAR,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct XSQLVAR {
    pub sqltype: ISC_SHORT,
    pub sqlscale: ISC_SHORT,
    pub sqlsubtype: ISC_SHORT,
    pub sqllen: ISC_SHORT,
    pub sqldata: *mut ISC_SCHAR,
    pub sqlind: *mut ISC_SHORT,
    pub sqlname_length: ISC_SHORT,
    pub sqlname: [ISC_SCHAR; 32],
    pub relname_length: ISC_SHORT,
    pub relname: [ISC_SCHAR; 32],
    pub ownname_length: ISC_SHORT,
    pub ownname: [ISC_SCHAR; 32],
    pub aliasname_length: ISC_SHORT,
    pub aliasname: [ISC_SCHAR; 32],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct XSQLDA {
    pub version: ISC_SHORT,
    pub sqldaid: [ISC_SCHAR; 8],
    pub sqldabc: ISC_LONG,
    pub sqln: ISC_SHORT,
    pub sqld: ISC_SHORT,
    pub sqlvar: [XSQLVAR; 1],
}

pub const SQLDA_VERSION1: ISC_SHORT = 1;
pub const SQL_DIALECT_V5: u16 = 1;
pub const SQL_DIALECT_V6: u16 = 3;

pub const ISC_TIME_SECONDS_PRECISION: u32 = 10000;

// Status vector arguments
pub const isc_arg_end: ISC_STATUS = 0;
pub const isc_arg_gds: ISC_STATUS = 1;
pub const isc_arg_string: ISC_STATUS = 2;
pub const isc_arg_cstring: ISC_STATUS = 3;
pub const isc_arg_number: ISC_STATUS = 4;
pub const isc_arg_interpreted: ISC_STATUS = 5;
pub const isc_arg_warning: ISC_STATUS = 18;
pub const isc_arg_sql_state: ISC_STATUS = 19;

// Benign and well known engine codes
pub const isc_segment: ISC_STATUS = 335544366;
pub const isc_segstr_eof: ISC_STATUS = 335544367;
pub const isc_bad_db_handle: ISC_STATUS = 335544324;
pub const isc_io_error: ISC_STATUS = 335544344;
pub const isc_lock_conflict: ISC_STATUS = 335544345;
pub const isc_dsql_error: ISC_STATUS = 335544569;
pub const isc_no_cur_rec: ISC_STATUS = 335544348;

/// Status returned by `isc_dsql_fetch` when the cursor is exhausted
pub const FETCH_NO_MORE_ROWS: ISC_STATUS = 100;

// Sql types
pub const SQL_TEXT: u32 = 452;
pub const SQL_VARYING: u32 = 448;
pub const SQL_SHORT: u32 = 500;
pub const SQL_LONG: u32 = 496;
pub const SQL_FLOAT: u32 = 482;
pub const SQL_DOUBLE: u32 = 480;
pub const SQL_D_FLOAT: u32 = 530;
pub const SQL_TIMESTAMP: u32 = 510;
pub const SQL_BLOB: u32 = 520;
pub const SQL_ARRAY: u32 = 540;
pub const SQL_QUAD: u32 = 550;
pub const SQL_TYPE_TIME: u32 = 560;
pub const SQL_TYPE_DATE: u32 = 570;
pub const SQL_INT64: u32 = 580;
pub const SQL_BOOLEAN: u32 = 32764;
pub const SQL_NULL: u32 = 32766;

// Array element types
pub const blr_text: u8 = 14;
pub const blr_text2: u8 = 15;
pub const blr_short: u8 = 7;
pub const blr_long: u8 = 8;
pub const blr_quad: u8 = 9;
pub const blr_float: u8 = 10;
pub const blr_d_float: u8 = 11;
pub const blr_sql_date: u8 = 12;
pub const blr_sql_time: u8 = 13;
pub const blr_int64: u8 = 16;
pub const blr_bool: u8 = 23;
pub const blr_double: u8 = 27;
pub const blr_timestamp: u8 = 35;
pub const blr_varying: u8 = 37;
pub const blr_varying2: u8 = 38;
pub const blr_cstring: u8 = 40;
pub const blr_cstring2: u8 = 41;

// Statement free options
pub const DSQL_close: u16 = 1;
pub const DSQL_drop: u16 = 2;
pub const DSQL_unprepare: u16 = 4;

// Database parameter buffer
pub const isc_dpb_version1: u8 = 1;
pub const isc_dpb_page_size: u8 = 4;
pub const isc_dpb_num_buffers: u8 = 5;
pub const isc_dpb_force_write: u8 = 24;
pub const isc_dpb_user_name: u8 = 28;
pub const isc_dpb_password: u8 = 29;
pub const isc_dpb_lc_ctype: u8 = 48;
pub const isc_dpb_sql_role_name: u8 = 60;
pub const isc_dpb_sql_dialect: u8 = 63;

// Transaction parameter buffer
pub const isc_tpb_version3: u8 = 3;
pub const isc_tpb_consistency: u8 = 1;
pub const isc_tpb_concurrency: u8 = 2;
pub const isc_tpb_shared: u8 = 3;
pub const isc_tpb_protected: u8 = 4;
pub const isc_tpb_exclusive: u8 = 5;
pub const isc_tpb_wait: u8 = 6;
pub const isc_tpb_nowait: u8 = 7;
pub const isc_tpb_read: u8 = 8;
pub const isc_tpb_write: u8 = 9;
pub const isc_tpb_lock_read: u8 = 10;
pub const isc_tpb_lock_write: u8 = 11;
pub const isc_tpb_verb_time: u8 = 12;
pub const isc_tpb_commit_time: u8 = 13;
pub const isc_tpb_ignore_limbo: u8 = 14;
pub const isc_tpb_read_committed: u8 = 15;
pub const isc_tpb_autocommit: u8 = 16;
pub const isc_tpb_rec_version: u8 = 17;
pub const isc_tpb_no_rec_version: u8 = 18;
pub const isc_tpb_restart_requests: u8 = 19;
pub const isc_tpb_no_auto_undo: u8 = 20;
pub const isc_tpb_lock_timeout: u8 = 21;

// Event parameter buffer
pub const EPB_version1: u8 = 1;

// Common info items
pub const isc_info_end: u8 = 1;
pub const isc_info_truncated: u8 = 2;
pub const isc_info_error: u8 = 3;
pub const isc_info_data_not_ready: u8 = 4;
pub const isc_info_length: u8 = 126;
pub const isc_info_flag_end: u8 = 127;

// Database info items
pub const isc_info_db_id: u8 = 4;
pub const isc_info_reads: u8 = 5;
pub const isc_info_writes: u8 = 6;
pub const isc_info_fetches: u8 = 7;
pub const isc_info_marks: u8 = 8;
pub const isc_info_implementation: u8 = 11;
pub const isc_info_isc_version: u8 = 12;
pub const isc_info_base_level: u8 = 13;
pub const isc_info_page_size: u8 = 14;
pub const isc_info_num_buffers: u8 = 15;
pub const isc_info_limbo: u8 = 16;
pub const isc_info_current_memory: u8 = 17;
pub const isc_info_max_memory: u8 = 18;
pub const isc_info_allocation: u8 = 21;
pub const isc_info_attachment_id: u8 = 22;
pub const isc_info_read_seq_count: u8 = 23;
pub const isc_info_read_idx_count: u8 = 24;
pub const isc_info_insert_count: u8 = 25;
pub const isc_info_update_count: u8 = 26;
pub const isc_info_delete_count: u8 = 27;
pub const isc_info_backout_count: u8 = 28;
pub const isc_info_purge_count: u8 = 29;
pub const isc_info_expunge_count: u8 = 30;
pub const isc_info_sweep_interval: u8 = 31;
pub const isc_info_ods_version: u8 = 32;
pub const isc_info_ods_minor_version: u8 = 33;
pub const isc_info_no_reserve: u8 = 34;
pub const isc_info_forced_writes: u8 = 52;
pub const isc_info_user_names: u8 = 53;
pub const isc_info_db_sql_dialect: u8 = 62;
pub const isc_info_db_read_only: u8 = 63;
pub const isc_info_db_size_in_pages: u8 = 64;

// Sql info items
pub const isc_info_sql_select: u8 = 4;
pub const isc_info_sql_bind: u8 = 5;
pub const isc_info_sql_num_variables: u8 = 6;
pub const isc_info_sql_describe_vars: u8 = 7;
pub const isc_info_sql_describe_end: u8 = 8;
pub const isc_info_sql_sqlda_seq: u8 = 9;
pub const isc_info_sql_message_seq: u8 = 10;
pub const isc_info_sql_type: u8 = 11;
pub const isc_info_sql_sub_type: u8 = 12;
pub const isc_info_sql_scale: u8 = 13;
pub const isc_info_sql_length: u8 = 14;
pub const isc_info_sql_null_ind: u8 = 15;
pub const isc_info_sql_field: u8 = 16;
pub const isc_info_sql_relation: u8 = 17;
pub const isc_info_sql_owner: u8 = 18;
pub const isc_info_sql_alias: u8 = 19;
pub const isc_info_sql_sqlda_start: u8 = 20;
pub const isc_info_sql_stmt_type: u8 = 21;
pub const isc_info_sql_get_plan: u8 = 22;
pub const isc_info_sql_records: u8 = 23;
pub const isc_info_sql_batch_fetch: u8 = 24;

// Statement types reported by isc_info_sql_stmt_type
pub const isc_info_sql_stmt_select: u32 = 1;
pub const isc_info_sql_stmt_insert: u32 = 2;
pub const isc_info_sql_stmt_update: u32 = 3;
pub const isc_info_sql_stmt_delete: u32 = 4;
pub const isc_info_sql_stmt_ddl: u32 = 5;
pub const isc_info_sql_stmt_get_segment: u32 = 6;
pub const isc_info_sql_stmt_put_segment: u32 = 7;
pub const isc_info_sql_stmt_exec_procedure: u32 = 8;
pub const isc_info_sql_stmt_start_trans: u32 = 9;
pub const isc_info_sql_stmt_commit: u32 = 10;
pub const isc_info_sql_stmt_rollback: u32 = 11;
pub const isc_info_sql_stmt_select_for_upd: u32 = 12;
pub const isc_info_sql_stmt_set_generator: u32 = 13;
pub const isc_info_sql_stmt_savepoint: u32 = 14;

// Sub items of isc_info_sql_records
pub const isc_info_req_select_count: u8 = 13;
pub const isc_info_req_insert_count: u8 = 14;
pub const isc_info_req_update_count: u8 = 15;
pub const isc_info_req_delete_count: u8 = 16;

// Blob info items
pub const isc_info_blob_num_segments: u8 = 4;
pub const isc_info_blob_max_segment: u8 = 5;
pub const isc_info_blob_total_length: u8 = 6;
pub const isc_info_blob_type: u8 = 7;
