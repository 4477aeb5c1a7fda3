//! Column and statement types

use num_enum::TryFromPrimitive;
use std::{convert::TryFrom, fmt};

use crate::{ibase, FbError};

/// Types the engine uses on the XSQLDA, without the nullable bit
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum WireType {
    Text = ibase::SQL_TEXT,
    Varying = ibase::SQL_VARYING,
    Short = ibase::SQL_SHORT,
    Long = ibase::SQL_LONG,
    Int64 = ibase::SQL_INT64,
    Float = ibase::SQL_FLOAT,
    Double = ibase::SQL_DOUBLE,
    DFloat = ibase::SQL_D_FLOAT,
    Timestamp = ibase::SQL_TIMESTAMP,
    Date = ibase::SQL_TYPE_DATE,
    Time = ibase::SQL_TYPE_TIME,
    Blob = ibase::SQL_BLOB,
    Array = ibase::SQL_ARRAY,
    Boolean = ibase::SQL_BOOLEAN,
}

impl WireType {
    /// Wire type of a XSQLVAR `sqltype`, ignoring the nullable bit
    pub fn from_sqltype(sqltype: i16) -> Result<Self, FbError> {
        let code = (sqltype & !1) as u16 as u32;

        WireType::try_from(code).map_err(|_| {
            FbError::logic(
                "Row::AllocVariables",
                format!("Found an unknown sqltype {}", code),
            )
        })
    }

    /// Wire type of an array element
    pub fn from_blr(dtype: u8) -> Result<Self, FbError> {
        Ok(match dtype {
            ibase::blr_text | ibase::blr_text2 => WireType::Text,
            ibase::blr_varying | ibase::blr_varying2 => WireType::Varying,
            ibase::blr_cstring | ibase::blr_cstring2 => WireType::Varying,
            ibase::blr_short => WireType::Short,
            ibase::blr_long => WireType::Long,
            ibase::blr_int64 => WireType::Int64,
            ibase::blr_float => WireType::Float,
            ibase::blr_double => WireType::Double,
            ibase::blr_d_float => WireType::DFloat,
            ibase::blr_timestamp => WireType::Timestamp,
            ibase::blr_sql_date => WireType::Date,
            ibase::blr_sql_time => WireType::Time,
            ibase::blr_bool => WireType::Boolean,
            _ => return Err(FbError::logic("Array::Describe", "Unknown array type")),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            WireType::Text => "CHAR",
            WireType::Varying => "VARCHAR",
            WireType::Short => "SMALLINT",
            WireType::Long => "INTEGER",
            WireType::Int64 => "BIGINT",
            WireType::Float => "FLOAT",
            WireType::Double | WireType::DFloat => "DOUBLE PRECISION",
            WireType::Timestamp => "TIMESTAMP",
            WireType::Date => "DATE",
            WireType::Time => "TIME",
            WireType::Blob => "BLOB",
            WireType::Array => "ARRAY",
            WireType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column types as seen by the applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDataType {
    Array,
    Blob,
    Date,
    Time,
    Timestamp,
    String,
    Smallint,
    Integer,
    Largeint,
    Float,
    Double,
    Boolean,
}

impl From<WireType> for SqlDataType {
    fn from(wire: WireType) -> Self {
        match wire {
            WireType::Text | WireType::Varying => SqlDataType::String,
            WireType::Short => SqlDataType::Smallint,
            WireType::Long => SqlDataType::Integer,
            WireType::Int64 => SqlDataType::Largeint,
            WireType::Float => SqlDataType::Float,
            WireType::Double | WireType::DFloat => SqlDataType::Double,
            WireType::Timestamp => SqlDataType::Timestamp,
            WireType::Date => SqlDataType::Date,
            WireType::Time => SqlDataType::Time,
            WireType::Blob => SqlDataType::Blob,
            WireType::Array => SqlDataType::Array,
            WireType::Boolean => SqlDataType::Boolean,
        }
    }
}

/// Kind of a prepared statement, as reported by `isc_info_sql_stmt_type`
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum StatementType {
    /// Not prepared
    Unknown = 0,
    Select = ibase::isc_info_sql_stmt_select,
    Insert = ibase::isc_info_sql_stmt_insert,
    Update = ibase::isc_info_sql_stmt_update,
    Delete = ibase::isc_info_sql_stmt_delete,
    Ddl = ibase::isc_info_sql_stmt_ddl,
    ExecProcedure = ibase::isc_info_sql_stmt_exec_procedure,
    SelectForUpdate = ibase::isc_info_sql_stmt_select_for_upd,
    SetGenerator = ibase::isc_info_sql_stmt_set_generator,
    Savepoint = ibase::isc_info_sql_stmt_savepoint,
}

impl StatementType {
    /// Kind reported by the engine. Transaction control and blob
    /// segment statements are rejected
    pub fn from_info(code: i32) -> Result<Self, FbError> {
        let code = code as u32;
        match code {
            ibase::isc_info_sql_stmt_start_trans
            | ibase::isc_info_sql_stmt_commit
            | ibase::isc_info_sql_stmt_rollback => Err(FbError::logic(
                "Statement::Prepare",
                "Transaction control statements are not supported, use the Transaction methods",
            )),
            0 => Err(FbError::logic("Statement::Prepare", "Unknown statement type")),
            _ => StatementType::try_from(code).map_err(|_| {
                FbError::logic(
                    "Statement::Prepare",
                    format!("Unsupported statement type {}", code),
                )
            }),
        }
    }

    /// Statements returning their rows through a cursor
    pub fn is_select(&self) -> bool {
        matches!(self, StatementType::Select | StatementType::SelectForUpdate)
    }
}

/// Raw database key of a row (`RDB$DB_KEY`)
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct DbKey(pub Vec<u8>);

impl DbKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for DbKey {
    /// Hexadecimal, one group per 8 bytes
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.0.chunks(8).enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            for b in chunk {
                write!(f, "{:02X}", b)?;
            }
        }
        Ok(())
    }
}
