//! Error type of the client layer

use thiserror::Error;

use crate::ibase::ISC_STATUS;

#[derive(Debug, Error)]
pub enum FbError {
    /// A precondition violated inside this layer
    #[error("{origin}: {msg}")]
    Logic { origin: &'static str, msg: String },

    /// The engine reported a failure through its status vector
    #[error("{origin}: {msg}")]
    Sql {
        origin: &'static str,
        msg: String,
        sql_code: i32,
        engine_code: ISC_STATUS,
    },

    /// Malformed or unexpected engine response
    #[error("{origin}: {msg}")]
    Protocol { origin: &'static str, msg: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FbError {
    pub fn logic<S: Into<String>>(origin: &'static str, msg: S) -> Self {
        FbError::Logic {
            origin,
            msg: msg.into(),
        }
    }

    pub fn protocol<S: Into<String>>(origin: &'static str, msg: S) -> Self {
        FbError::Protocol {
            origin,
            msg: msg.into(),
        }
    }

    /// Qualified name of the failing operation
    pub fn origin(&self) -> &str {
        match self {
            FbError::Logic { origin, .. }
            | FbError::Sql { origin, .. }
            | FbError::Protocol { origin, .. } => origin,
            FbError::Io(_) => "",
        }
    }

    pub fn message(&self) -> String {
        match self {
            FbError::Logic { msg, .. }
            | FbError::Sql { msg, .. }
            | FbError::Protocol { msg, .. } => msg.clone(),
            FbError::Io(e) => e.to_string(),
        }
    }

    /// Sql code of an engine error, 0 otherwise
    pub fn sql_code(&self) -> i32 {
        match self {
            FbError::Sql { sql_code, .. } => *sql_code,
            _ => 0,
        }
    }

    /// Engine code of an engine error, 0 otherwise
    pub fn engine_code(&self) -> ISC_STATUS {
        match self {
            FbError::Sql { engine_code, .. } => *engine_code,
            _ => 0,
        }
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, FbError::Logic { .. })
    }

    pub fn is_sql(&self) -> bool {
        matches!(self, FbError::Sql { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, FbError::Protocol { .. } | FbError::Io(_))
    }
}

pub fn err_type_conv<T>(origin: &'static str, from: &str, to: &str) -> Result<T, FbError> {
    Err(FbError::logic(
        origin,
        format!("Incompatible types: can't convert {} column to {}", from, to),
    ))
}

pub fn err_out_of_range<T>(origin: &'static str) -> Result<T, FbError> {
    Err(FbError::logic(origin, "Out of range numeric conversion"))
}
