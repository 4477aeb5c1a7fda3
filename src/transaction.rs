//!
//! Rust Firebird Client
//!
//! Transaction functions
//!

use std::{cell::RefCell, rc::Rc, sync::Arc};

use ibpp_core::{
    ibase, FbClient, FbError, ParamBuffer, Status, TableReservation, TrOp,
    TransactionConfiguration,
};

use crate::{
    array::ArrayImpl,
    blob::BlobImpl,
    database::Database,
    dependents::{tracking, Dependents},
    statement::{Statement, StatementImpl},
};

pub(crate) struct TransactionImpl {
    handle: ibase::isc_tr_handle,
    /// Attached databases, with the tpb used for each one
    dbs: Vec<(Database, ParamBuffer)>,
    pub(crate) statements: Dependents<StatementImpl>,
    pub(crate) blobs: Dependents<BlobImpl>,
    pub(crate) arrays: Dependents<ArrayImpl>,
}

impl TransactionImpl {
    fn client(&self, origin: &'static str) -> Result<Arc<dyn FbClient>, FbError> {
        self.dbs
            .first()
            .map(|(db, _)| db.client())
            .ok_or_else(|| FbError::logic(origin, "No Database is attached."))
    }

    fn position(&self, db: &Database) -> Option<usize> {
        self.dbs.iter().position(|(d, _)| d.same(db))
    }

    /// Runs a commit or rollback. The handle is left untouched on failure
    fn end(&mut self, op: TrOp) -> Result<(), FbError> {
        let origin = match op {
            TrOp::Commit => "Transaction::Commit",
            TrOp::CommitRetaining => "Transaction::CommitRetain",
            TrOp::Rollback => "Transaction::Rollback",
            TrOp::RollbackRetaining => "Transaction::RollbackRetain",
        };

        if self.handle == 0 {
            return Err(FbError::logic(origin, "Transaction is not started."));
        }

        let client = self.client(origin)?;
        let mut status = Status::default();
        let mut handle = self.handle;
        match op {
            TrOp::Commit => client.commit_transaction(&mut status, &mut handle),
            TrOp::CommitRetaining => client.commit_retaining(&mut status, &mut handle),
            TrOp::Rollback => client.rollback_transaction(&mut status, &mut handle),
            TrOp::RollbackRetaining => client.rollback_retaining(&mut status, &mut handle),
        };
        status.check(client.as_ref(), origin, "The operation failed.")?;

        self.handle = if op.retains() { handle } else { 0 };
        log::debug!("{} done", origin);

        Ok(())
    }
}

impl Drop for TransactionImpl {
    fn drop(&mut self) {
        if self.handle != 0 {
            if let Err(e) = self.end(TrOp::Rollback) {
                log::warn!("Rollback of a dropped transaction failed: {}", e);
            }
        }
    }
}

/// A transaction over one or more databases
#[derive(Clone)]
pub struct Transaction(pub(crate) Rc<RefCell<TransactionImpl>>);

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// Transaction with no database attached yet
    pub fn new() -> Transaction {
        Transaction(Rc::new(RefCell::new(TransactionImpl {
            handle: 0,
            dbs: vec![],
            statements: Dependents::default(),
            blobs: Dependents::default(),
            arrays: Dependents::default(),
        })))
    }

    /// Transaction over `db`
    pub fn with_database(
        db: &Database,
        conf: TransactionConfiguration,
    ) -> Result<Transaction, FbError> {
        let tr = Transaction::new();
        tr.attach_database(db, conf)?;

        Ok(tr)
    }

    /// Adds a database to the transaction, with its own options
    pub fn attach_database(
        &self,
        db: &Database,
        conf: TransactionConfiguration,
    ) -> Result<(), FbError> {
        {
            let mut t = self.0.borrow_mut();
            if t.handle != 0 {
                return Err(FbError::logic(
                    "Transaction::AttachDatabase",
                    "Can't attach a Database if Transaction started.",
                ));
            }
            if t.position(db).is_some() {
                return Err(FbError::logic(
                    "Transaction::AttachDatabase",
                    "The Database is already attached.",
                ));
            }

            t.dbs.push((db.clone(), conf.to_tpb()));
        }

        db.attach_transaction(&self.0);

        Ok(())
    }

    pub fn detach_database(&self, db: &Database) -> Result<(), FbError> {
        {
            let mut t = self.0.borrow_mut();
            if t.handle != 0 {
                return Err(FbError::logic(
                    "Transaction::DetachDatabase",
                    "Can't detach a Database if Transaction started.",
                ));
            }

            let pos = t.position(db).ok_or_else(|| {
                FbError::logic(
                    "Transaction::DetachDatabase",
                    "The Database was not attached.",
                )
            })?;
            t.dbs.remove(pos);
        }

        db.forget_transaction(&self.0);

        Ok(())
    }

    /// Reserves `table` of an attached database when the transaction starts
    pub fn add_reservation(
        &self,
        db: &Database,
        table: &str,
        reservation: TableReservation,
    ) -> Result<(), FbError> {
        let mut t = self.0.borrow_mut();
        if t.handle != 0 {
            return Err(FbError::logic(
                "Transaction::AddReservation",
                "Can't add table reservation if Transaction started.",
            ));
        }

        let pos = t.position(db).ok_or_else(|| {
            FbError::logic(
                "Transaction::AddReservation",
                "The database must be attached in the Transaction before adding reservations.",
            )
        })?;
        reservation.append_to(&mut t.dbs[pos].1, table);

        Ok(())
    }

    /// Databases of the transaction, in attach order
    pub fn databases(&self) -> Vec<Database> {
        self.0.borrow().dbs.iter().map(|(db, _)| db.clone()).collect()
    }

    /// Tpb sent for `db` on start
    pub fn tpb(&self, db: &Database) -> Option<Vec<u8>> {
        let t = self.0.borrow();
        t.position(db).map(|pos| t.dbs[pos].1.as_bytes().to_vec())
    }

    /// Starts the transaction on every attached database at once
    pub fn start(&self) -> Result<(), FbError> {
        let mut t = self.0.borrow_mut();
        if t.handle != 0 {
            return Ok(());
        }

        if t.dbs.is_empty() {
            return Err(FbError::logic(
                "Transaction::Start",
                "No Database is attached.",
            ));
        }
        if t.dbs.iter().any(|(db, _)| !db.connected()) {
            return Err(FbError::logic(
                "Transaction::Start",
                "All attached Database should have been connected.",
            ));
        }

        let client = t.client("Transaction::Start")?;

        let t = &mut *t;
        let mut teb: Vec<(ibase::isc_db_handle, &[u8])> = t
            .dbs
            .iter()
            .map(|(db, tpb)| (db.handle(), tpb.as_bytes()))
            .collect();

        let mut status = Status::default();
        let mut handle = 0;
        client.start_multiple(&mut status, &mut handle, &mut teb);
        status.check(
            client.as_ref(),
            "Transaction::Start",
            "isc_start_multiple failed",
        )?;

        t.handle = handle;
        log::debug!("Transaction started over {} database(s)", t.dbs.len());

        Ok(())
    }

    pub fn commit(&self) -> Result<(), FbError> {
        self.end(TrOp::Commit)
    }

    pub fn rollback(&self) -> Result<(), FbError> {
        self.end(TrOp::Rollback)
    }

    /// Commits the work done so far, keeping the transaction started
    pub fn commit_retain(&self) -> Result<(), FbError> {
        self.end(TrOp::CommitRetaining)
    }

    /// Rolls back the work done so far, keeping the transaction started
    pub fn rollback_retain(&self) -> Result<(), FbError> {
        self.end(TrOp::RollbackRetaining)
    }

    fn end(&self, op: TrOp) -> Result<(), FbError> {
        self.0.borrow_mut().end(op)?;

        if !op.retains() {
            // The engine closed the cursors already
            let statements = self.0.borrow().statements.alive();
            for st in statements {
                if let Err(e) = Statement(st).cursor_free() {
                    log::warn!("Cursor cleanup after the transaction end failed: {}", e);
                }
            }
        }

        Ok(())
    }

    pub fn started(&self) -> bool {
        self.0.borrow().handle != 0
    }

    pub(crate) fn handle(&self) -> ibase::isc_tr_handle {
        self.0.borrow().handle
    }

    pub(crate) fn same(&self, other: &Transaction) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    tracking!(
        statements,
        StatementImpl,
        attach_statement,
        forget_statement,
        detach_statement,
        "Transaction::DetachStatement"
    );
    tracking!(
        blobs,
        BlobImpl,
        attach_blob,
        forget_blob,
        detach_blob,
        "Transaction::DetachBlob"
    );
    tracking!(
        arrays,
        ArrayImpl,
        attach_array,
        forget_array,
        detach_array,
        "Transaction::DetachArray"
    );
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.0.borrow();
        f.debug_struct("Transaction")
            .field("handle", &t.handle)
            .field("databases", &t.dbs.len())
            .finish()
    }
}
