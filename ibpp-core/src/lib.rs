//! Types, traits and constants shared by the firebird client layers:
//! the fbclient api seam, the wire buffers, the descriptor areas and
//! the value conversions

pub mod charset;
mod client;
pub mod convert;
pub mod date_time;
mod epb;
pub(crate) mod error;
pub mod ibase;
mod params;
mod result_buffer;
mod status;
mod transaction;
mod types;
mod value;
mod xsqlda;

pub use charset::Charset;
pub use client::FbClient;
pub use date_time::{Date, Time, Timestamp};
pub use epb::{Epb, MAX_EVENT_NAME};
pub use error::{err_type_conv, FbError};
pub use params::ParamBuffer;
pub use result_buffer::{ResponseWriter, ResultBuffer};
pub use status::Status;
pub use transaction::*;
pub use types::*;
pub use value::*;
pub use xsqlda::{XSqlDa, MAX_NAME_LENGTH};
