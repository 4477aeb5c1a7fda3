//!
//! Rust Firebird Client
//!
//! Object model over the fbclient api: databases, transactions,
//! statements, rows, blobs, arrays and events
//!

mod array;
mod blob;
mod database;
mod dependents;
mod events;
mod row;
mod statement;
mod transaction;

#[cfg(test)]
mod tests;

pub use crate::{
    array::Array,
    blob::{Blob, BlobInfo, MAX_SEGMENT},
    database::{Database, DatabaseBuilder, DatabaseCounts, DatabaseInfo, DatabaseStatistics},
    events::EventHandler,
    row::Row,
    statement::Statement,
    transaction::Transaction,
};
pub use ibpp_core::{
    ibase::{SQL_DIALECT_V5, SQL_DIALECT_V6},
    Charset, Date, DbKey, FbClient, FbError, FromValue, IntoValue, SqlDataType, StatementType,
    TableReservation, Time, Timestamp, TrDataAccessMode, TrIsolationLevel, TrLockResolution,
    TransactionConfiguration, TransactionFlags, Value, WireType,
};

/// Version of this layer, one byte each for major, minor, patch and build
pub const VERSION: u32 = 0x0001_0000;

/// Loads the fbclient library and tells if an application built against
/// `app_version` can use this layer. The build byte is ignored
pub fn check_version(app_version: u32) -> Result<bool, FbError> {
    let client = ibpp_native::client()?;
    log::debug!(
        "Client library version {}.{}",
        client.client_major_version(),
        client.client_minor_version()
    );

    Ok(versions_match(app_version))
}

fn versions_match(app_version: u32) -> bool {
    (app_version & 0xFFFF_FF00) == (VERSION & 0xFFFF_FF00)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_byte_is_ignored() {
        assert!(versions_match(VERSION));
        assert!(versions_match(VERSION | 0x7F));
        assert!(!versions_match(VERSION + 0x100));
        assert!(!versions_match(VERSION ^ 0x0100_0000));
    }
}
