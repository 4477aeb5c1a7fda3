//! Firebird transaction options
//!
//! More info about transactions in firebird:
//! https://firebirdsql.org/file/documentation/html/en/refdocs/fblangref30/firebird-30-language-reference.html#fblangref30-transacs

use std::convert::TryFrom;

use crate::{ibase, params::ParamBuffer, FbError};

/// Transaction isolation level
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TrIsolationLevel {
    /// Transactions can't see alterations commited after they started
    Concurrency,
    /// Sees the latest committed version of the rows, even with other
    /// versions pending
    ReadDirty,
    /// Transactions can see alterations commited after they started
    ReadCommitted,
    /// Table locking
    Consistency,
}

impl Default for TrIsolationLevel {
    fn default() -> Self {
        Self::Concurrency
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
/// Commit / Rollback operations
pub enum TrOp {
    Commit,
    CommitRetaining,
    Rollback,
    RollbackRetaining,
}

impl TrOp {
    /// The transaction is still started after the operation
    pub fn retains(&self) -> bool {
        matches!(self, TrOp::CommitRetaining | TrOp::RollbackRetaining)
    }
}

/// Lock resolution modes
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TrLockResolution {
    /// In the NO WAIT mode, a transaction will immediately throw a database exception if a conflict occurs
    NoWait,
    /// In the WAIT model, transaction will wait till the other transaction has finished.
    ///
    /// If a TIMEOUT is specified for the WAIT transaction, waiting will continue only for the number of seconds specified
    Wait(Option<u32>),
}

impl Default for TrLockResolution {
    fn default() -> Self {
        Self::Wait(None)
    }
}

/// Data access mode
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TrDataAccessMode {
    /// Operations in the context of this transaction can be both read operations and data update operations
    ReadWrite = ibase::isc_tpb_write,
    /// Only SELECT operations can be executed in the context of this transaction
    ReadOnly = ibase::isc_tpb_read,
}

impl Default for TrDataAccessMode {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// Optional tpb items
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct TransactionFlags {
    pub ignore_limbo: bool,
    pub autocommit: bool,
    pub no_auto_undo: bool,
}

/// Parameters of a transaction over one database
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone)]
pub struct TransactionConfiguration {
    pub data_access: TrDataAccessMode,
    pub isolation: TrIsolationLevel,
    pub lock_resolution: TrLockResolution,
    pub flags: TransactionFlags,
}

impl TransactionConfiguration {
    /// Builds the transaction parameter buffer
    pub fn to_tpb(&self) -> ParamBuffer {
        let mut tpb = ParamBuffer::tpb();

        tpb.insert_item(self.data_access as u8);

        match self.isolation {
            TrIsolationLevel::Consistency => tpb.insert_item(ibase::isc_tpb_consistency),
            TrIsolationLevel::ReadDirty => {
                tpb.insert_item(ibase::isc_tpb_read_committed);
                tpb.insert_item(ibase::isc_tpb_rec_version);
            }
            TrIsolationLevel::ReadCommitted => {
                tpb.insert_item(ibase::isc_tpb_read_committed);
                tpb.insert_item(ibase::isc_tpb_no_rec_version);
            }
            TrIsolationLevel::Concurrency => tpb.insert_item(ibase::isc_tpb_concurrency),
        }

        match self.lock_resolution {
            TrLockResolution::NoWait => tpb.insert_item(ibase::isc_tpb_nowait),
            TrLockResolution::Wait(timeout) => {
                tpb.insert_item(ibase::isc_tpb_wait);
                if let Some(seconds) = timeout {
                    tpb.insert_i32(ibase::isc_tpb_lock_timeout, seconds as i32);
                }
            }
        }

        if self.flags.ignore_limbo {
            tpb.insert_item(ibase::isc_tpb_ignore_limbo);
        }
        if self.flags.autocommit {
            tpb.insert_item(ibase::isc_tpb_autocommit);
        }
        if self.flags.no_auto_undo {
            tpb.insert_item(ibase::isc_tpb_no_auto_undo);
        }

        tpb
    }
}

/// Table reservation modes
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TableReservation {
    SharedWrite = 1,
    SharedRead = 2,
    ProtectedWrite = 3,
    ProtectedRead = 4,
}

impl TableReservation {
    /// Appends the reservation of `table` to a tpb
    pub fn append_to(&self, tpb: &mut ParamBuffer, table: &str) {
        let (lock, mode) = match self {
            TableReservation::SharedWrite => (ibase::isc_tpb_lock_write, ibase::isc_tpb_shared),
            TableReservation::SharedRead => (ibase::isc_tpb_lock_read, ibase::isc_tpb_shared),
            TableReservation::ProtectedWrite => {
                (ibase::isc_tpb_lock_write, ibase::isc_tpb_protected)
            }
            TableReservation::ProtectedRead => (ibase::isc_tpb_lock_read, ibase::isc_tpb_protected),
        };

        tpb.insert_item(lock);
        tpb.insert_len_str(table);
        tpb.insert_item(mode);
    }
}

impl TryFrom<u8> for TableReservation {
    type Error = FbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => TableReservation::SharedWrite,
            2 => TableReservation::SharedRead,
            3 => TableReservation::ProtectedWrite,
            4 => TableReservation::ProtectedRead,
            _ => {
                return Err(FbError::logic(
                    "Transaction::AddReservation",
                    "Illegal TTR value detected.",
                ))
            }
        })
    }
}
