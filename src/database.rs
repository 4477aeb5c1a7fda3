//!
//! Rust Firebird Client
//!
//! Database connection, info queries and events
//!

use std::{cell::RefCell, rc::Rc, sync::Arc};

use ibpp_core::{
    charset::UTF_8, ibase, Charset, FbClient, FbError, ParamBuffer, ResultBuffer, Status,
};

use crate::{
    array::{Array, ArrayImpl},
    blob::{Blob, BlobImpl},
    dependents::{tracking, Dependents},
    events::{EventHandler, Events},
    statement::{sql_text, Statement, StatementImpl},
    transaction::{Transaction, TransactionImpl},
};

/// Oldest on disk structure accepted, Firebird 1.0 and earlier are 10 or less
const MIN_ODS: i32 = 10;

/// Static properties of a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseInfo {
    pub ods: i32,
    pub ods_minor: i32,
    pub page_size: i32,
    /// Allocated pages
    pub pages: i32,
    /// Page buffers of the cache
    pub buffers: i32,
    pub sweep: i32,
    /// Forced writes
    pub sync: bool,
    /// Space reserved on the data pages for the record versions
    pub reserve: bool,
    pub read_only: bool,
}

/// Page activity of the attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseStatistics {
    pub fetches: i32,
    pub marks: i32,
    pub reads: i32,
    pub writes: i32,
}

/// Record operations of the attachment, summed over the tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseCounts {
    pub inserts: i32,
    pub updates: i32,
    pub deletes: i32,
    pub read_idx: i32,
    pub read_seq: i32,
}

/// Builder of a [`Database`]. Nothing is sent to the server until
/// [`Database::connect`] or [`Database::create`]
#[derive(Clone, Default)]
pub struct DatabaseBuilder {
    server: String,
    database: String,
    user: String,
    password: String,
    role: String,
    charset: String,
    create_params: String,
    client: Option<Arc<dyn FbClient>>,
}

impl DatabaseBuilder {
    /// Server host name, empty for a local connection
    pub fn server<S: Into<String>>(&mut self, server: S) -> &mut Self {
        self.server = server.into();
        self
    }

    /// Database path or alias on the server
    pub fn database<S: Into<String>>(&mut self, database: S) -> &mut Self {
        self.database = database.into();
        self
    }

    pub fn user<S: Into<String>>(&mut self, user: S) -> &mut Self {
        self.user = user.into();
        self
    }

    pub fn password<S: Into<String>>(&mut self, password: S) -> &mut Self {
        self.password = password.into();
        self
    }

    pub fn role<S: Into<String>>(&mut self, role: S) -> &mut Self {
        self.role = role.into();
        self
    }

    /// Firebird name of the connection charset, like `UTF8` or `WIN1252`
    pub fn charset<S: Into<String>>(&mut self, charset: S) -> &mut Self {
        self.charset = charset.into();
        self
    }

    /// Appended to the `CREATE DATABASE` statement, like `PAGE_SIZE 8192`
    pub fn create_params<S: Into<String>>(&mut self, params: S) -> &mut Self {
        self.create_params = params.into();
        self
    }

    /// Client used instead of the fbclient library
    pub fn client(&mut self, client: Arc<dyn FbClient>) -> &mut Self {
        self.client = Some(client);
        self
    }

    /// Loads the fbclient library unless a client was given
    pub fn build(&self) -> Result<Database, FbError> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => ibpp_native::client()?,
        };

        let charset = if self.charset.is_empty() {
            Charset::default()
        } else {
            Charset::from_firebird_name(&self.charset)
        };

        Ok(Database(Rc::new(RefCell::new(DatabaseImpl {
            client,
            handle: 0,
            server: self.server.clone(),
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            role: self.role.clone(),
            charset_name: self.charset.clone(),
            create_params: self.create_params.clone(),
            charset,
            dialect: ibase::SQL_DIALECT_V6,
            events: None,
            dispatching: false,
            transactions: Dependents::default(),
            statements: Dependents::default(),
            blobs: Dependents::default(),
            arrays: Dependents::default(),
        }))))
    }
}

pub(crate) struct DatabaseImpl {
    client: Arc<dyn FbClient>,
    handle: ibase::isc_db_handle,
    server: String,
    database: String,
    user: String,
    password: String,
    role: String,
    charset_name: String,
    create_params: String,
    charset: Charset,
    dialect: u16,
    events: Option<Events>,
    /// Handlers are running, the events can't change
    dispatching: bool,
    pub(crate) transactions: Dependents<TransactionImpl>,
    pub(crate) statements: Dependents<StatementImpl>,
    pub(crate) blobs: Dependents<BlobImpl>,
    pub(crate) arrays: Dependents<ArrayImpl>,
}

impl DatabaseImpl {
    /// `server:path`, or the path alone for a local database
    fn connect_string(&self) -> String {
        if self.server.is_empty() {
            self.database.clone()
        } else {
            format!("{}:{}", self.server, self.database)
        }
    }

    fn check_names(&self, origin: &'static str) -> Result<(), FbError> {
        if self.database.is_empty() {
            return Err(FbError::logic(origin, "Unspecified database name."));
        }
        if self.user.is_empty() {
            return Err(FbError::logic(origin, "Unspecified user name."));
        }
        Ok(())
    }

    fn cancel_events(&mut self) -> Result<(), FbError> {
        match self.events.as_mut() {
            Some(events) => events.cancel(self.client.as_ref(), &mut self.handle),
            None => Ok(()),
        }
    }

    fn queue_events(&mut self) -> Result<(), FbError> {
        if self.handle == 0 {
            return Ok(());
        }

        match self.events.as_mut() {
            Some(events) => events.queue(self.client.as_ref(), &mut self.handle),
            None => Ok(()),
        }
    }

    /// Detaches after a failed post attach check
    fn reject(&mut self, err: FbError) -> FbError {
        let mut status = Status::default();
        self.client.detach_database(&mut status, &mut self.handle);
        if status.has_errors() {
            log::warn!(
                "Detach after a rejected connection failed: {}",
                status.message(self.client.as_ref())
            );
        }
        self.handle = 0;

        err
    }

    fn connect(&mut self) -> Result<(), FbError> {
        if self.handle != 0 {
            return Ok(());
        }
        self.check_names("Database::Connect")?;

        let mut dpb = ParamBuffer::dpb();
        dpb.insert_str(ibase::isc_dpb_user_name, &self.user);
        dpb.insert_str(ibase::isc_dpb_password, &self.password);
        if !self.role.is_empty() {
            dpb.insert_str(ibase::isc_dpb_sql_role_name, &self.role);
        }
        if !self.charset_name.is_empty() {
            dpb.insert_str(ibase::isc_dpb_lc_ctype, &self.charset_name);
        }

        let path = self.connect_string();
        let mut status = Status::default();
        self.client
            .attach_database(&mut status, path.as_bytes(), &mut self.handle, dpb.as_bytes());
        if status.has_errors() {
            self.handle = 0;
            return Err(status.as_error(
                self.client.as_ref(),
                "Database::Connect",
                "isc_attach_database failed",
            ));
        }

        let items = [
            ibase::isc_info_ods_version,
            ibase::isc_info_db_sql_dialect,
            ibase::isc_info_end,
        ];
        let mut rb = ResultBuffer::new(100);
        status.reset();
        self.client
            .database_info(&mut status, &mut self.handle, &items, rb.as_mut_bytes());
        if status.has_errors() {
            let err = status.as_error(
                self.client.as_ref(),
                "Database::Connect",
                "isc_database_info failed",
            );
            return Err(self.reject(err));
        }

        let ods = match rb.get_int(ibase::isc_info_ods_version) {
            Ok(ods) => ods,
            Err(e) => return Err(self.reject(e)),
        };
        if ods < MIN_ODS {
            return Err(self.reject(FbError::logic(
                "Database::Connect",
                format!(
                    "Unsupported Server : wrong ODS version ({}), at least '{}' required.",
                    ods, MIN_ODS
                ),
            )));
        }

        // Dialect 1 databases don't always report it
        let dialect = rb
            .get_int(ibase::isc_info_db_sql_dialect)
            .unwrap_or(ibase::SQL_DIALECT_V5 as i32);
        if dialect != ibase::SQL_DIALECT_V5 as i32 && dialect != ibase::SQL_DIALECT_V6 as i32 {
            return Err(self.reject(FbError::logic(
                "Database::Connect",
                "Dialect 1 or 3 required",
            )));
        }

        if ods >= 11 && self.client.client_major_version() < 2 {
            return Err(self.reject(FbError::logic(
                "Database::Connect",
                "The client library is too old for this server, version 2.0 or later required",
            )));
        }

        self.dialect = dialect as u16;
        log::debug!("Connected to {} (ods {}, dialect {})", path, ods, dialect);

        Ok(())
    }

    fn info_call(
        &mut self,
        origin: &'static str,
        items: &[u8],
        size: usize,
    ) -> Result<ResultBuffer, FbError> {
        if self.handle == 0 {
            return Err(FbError::logic(origin, "Database is not connected."));
        }

        let mut rb = ResultBuffer::new(size);
        let mut status = Status::default();
        self.client
            .database_info(&mut status, &mut self.handle, items, rb.as_mut_bytes());
        status.check(self.client.as_ref(), origin, "isc_database_info failed")?;

        Ok(rb)
    }
}

impl Drop for DatabaseImpl {
    fn drop(&mut self) {
        if self.handle == 0 {
            return;
        }

        if let Err(e) = self.cancel_events() {
            log::warn!("Event cancel of a dropped database failed: {}", e);
        }

        let mut status = Status::default();
        self.client.detach_database(&mut status, &mut self.handle);
        if status.has_errors() {
            log::warn!(
                "Detach of a dropped database failed: {}",
                status.message(self.client.as_ref())
            );
        }
        self.handle = 0;
    }
}

/// A database, connected or not
#[derive(Clone)]
pub struct Database(pub(crate) Rc<RefCell<DatabaseImpl>>);

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Creates the database with a `CREATE DATABASE` statement, the
    /// connection is closed afterwards
    pub fn create(&self, dialect: u16) -> Result<(), FbError> {
        {
            let mut d = self.0.borrow_mut();
            if d.handle != 0 {
                return Err(FbError::logic(
                    "Database::Create",
                    "Database is already connected.",
                ));
            }
            d.check_names("Database::Create")?;
            if dialect != ibase::SQL_DIALECT_V5 && dialect != ibase::SQL_DIALECT_V6 {
                return Err(FbError::logic(
                    "Database::Create",
                    "Only dialects 1 and 3 are supported.",
                ));
            }

            let mut sql = format!(
                "CREATE DATABASE '{}' USER '{}' PASSWORD '{}'",
                d.connect_string(),
                d.user,
                d.password
            );
            if !d.create_params.is_empty() {
                sql.push(' ');
                sql.push_str(&d.create_params);
            }

            let text = sql_text(&UTF_8, &sql, "Database::Create")?;

            let d = &mut *d;
            let mut tr = 0;
            let mut status = Status::default();
            d.client.dsql_execute_immediate(
                &mut status,
                &mut d.handle,
                &mut tr,
                &text,
                dialect,
                None,
            );
            if status.has_errors() {
                d.handle = 0;
                return Err(status.as_error(
                    d.client.as_ref(),
                    "Database::Create",
                    "isc_dsql_execute_immediate failed",
                ));
            }

            log::debug!("Created the database {}", d.connect_string());
        }

        self.disconnect()
    }

    /// Attaches to the database, does nothing when already connected.
    ///
    /// The attachment is refused, and left disconnected, for an on disk
    /// structure older than Firebird 1.0 or a dialect other than 1 or 3
    pub fn connect(&self) -> Result<(), FbError> {
        self.0.borrow_mut().connect()
    }

    /// Releases everything depending on the connection: the events are
    /// cancelled, the started transactions rolled back, and the blobs,
    /// arrays, statements and transactions detached
    pub fn inactivate(&self) -> Result<(), FbError> {
        let (transactions, blobs, arrays, statements) = {
            let mut d = self.0.borrow_mut();
            if let Err(e) = d.cancel_events() {
                log::warn!("Event cancel failed: {}", e);
            }

            (
                d.transactions.alive(),
                d.blobs.alive(),
                d.arrays.alive(),
                d.statements.alive(),
            )
        };

        let transactions: Vec<Transaction> = transactions.into_iter().map(Transaction).collect();

        for tr in transactions.iter().filter(|tr| tr.started()) {
            if let Err(e) = tr.rollback() {
                log::warn!("Rollback on inactivate failed: {}", e);
            }
        }

        for blob in blobs.into_iter().map(Blob) {
            if let Err(e) = blob.detach_database() {
                log::warn!("Blob detach on inactivate failed: {}", e);
            }
        }
        for array in arrays.into_iter().map(Array) {
            if let Err(e) = array.detach_database() {
                log::warn!("Array detach on inactivate failed: {}", e);
            }
        }
        for st in statements.into_iter().map(Statement) {
            if let Err(e) = st.detach_database() {
                log::warn!("Statement detach on inactivate failed: {}", e);
            }
        }
        for tr in transactions {
            if let Err(e) = tr.detach_database(self) {
                log::warn!("Transaction detach on inactivate failed: {}", e);
            }
        }

        Ok(())
    }

    /// Inactivates, then detaches from the server
    pub fn disconnect(&self) -> Result<(), FbError> {
        if self.0.borrow().handle == 0 {
            return Ok(());
        }

        self.inactivate()?;

        let mut d = self.0.borrow_mut();
        let d = &mut *d;
        let mut status = Status::default();
        d.client.detach_database(&mut status, &mut d.handle);
        // Disconnected even when the engine call failed
        d.handle = 0;
        d.events = None;
        status.check(
            d.client.as_ref(),
            "Database::Disconnect",
            "isc_detach_database failed",
        )?;

        log::debug!("Disconnected from {}", d.connect_string());

        Ok(())
    }

    /// Drops the database on the server
    pub fn drop_database(&self) -> Result<(), FbError> {
        if self.0.borrow().handle == 0 {
            return Err(FbError::logic(
                "Database::Drop",
                "Database must be connected.",
            ));
        }

        self.inactivate()?;

        let mut d = self.0.borrow_mut();
        let d = &mut *d;
        let mut status = Status::default();
        d.client.drop_database(&mut status, &mut d.handle);
        status.check(
            d.client.as_ref(),
            "Database::Drop",
            "isc_drop_database failed",
        )?;
        d.handle = 0;
        d.events = None;

        log::debug!("Dropped the database {}", d.connect_string());

        Ok(())
    }

    pub fn connected(&self) -> bool {
        self.0.borrow().handle != 0
    }

    /// Sql dialect, as reported on connect
    pub fn dialect(&self) -> u16 {
        self.0.borrow().dialect
    }

    pub fn server(&self) -> String {
        self.0.borrow().server.clone()
    }

    pub fn database(&self) -> String {
        self.0.borrow().database.clone()
    }

    pub fn user(&self) -> String {
        self.0.borrow().user.clone()
    }

    pub fn role(&self) -> String {
        self.0.borrow().role.clone()
    }

    /// Charset of the text exchanged with the server
    pub fn charset(&self) -> Charset {
        self.0.borrow().charset.clone()
    }

    pub fn info(&self) -> Result<DatabaseInfo, FbError> {
        let items = [
            ibase::isc_info_ods_version,
            ibase::isc_info_ods_minor_version,
            ibase::isc_info_page_size,
            ibase::isc_info_allocation,
            ibase::isc_info_num_buffers,
            ibase::isc_info_sweep_interval,
            ibase::isc_info_forced_writes,
            ibase::isc_info_no_reserve,
            ibase::isc_info_db_read_only,
            ibase::isc_info_end,
        ];
        let rb = self.0.borrow_mut().info_call("Database::Info", &items, 256)?;

        Ok(DatabaseInfo {
            ods: rb.get_int(ibase::isc_info_ods_version)?,
            ods_minor: rb.get_int(ibase::isc_info_ods_minor_version)?,
            page_size: rb.get_int(ibase::isc_info_page_size)?,
            pages: rb.get_int(ibase::isc_info_allocation)?,
            buffers: rb.get_int(ibase::isc_info_num_buffers)?,
            sweep: rb.get_int(ibase::isc_info_sweep_interval)?,
            sync: rb.get_bool(ibase::isc_info_forced_writes)?,
            reserve: !rb.get_bool(ibase::isc_info_no_reserve)?,
            read_only: rb.get_bool(ibase::isc_info_db_read_only)?,
        })
    }

    pub fn statistics(&self) -> Result<DatabaseStatistics, FbError> {
        let items = [
            ibase::isc_info_fetches,
            ibase::isc_info_marks,
            ibase::isc_info_reads,
            ibase::isc_info_writes,
            ibase::isc_info_end,
        ];
        let rb = self
            .0
            .borrow_mut()
            .info_call("Database::Statistics", &items, 128)?;

        Ok(DatabaseStatistics {
            fetches: rb.get_int(ibase::isc_info_fetches)?,
            marks: rb.get_int(ibase::isc_info_marks)?,
            reads: rb.get_int(ibase::isc_info_reads)?,
            writes: rb.get_int(ibase::isc_info_writes)?,
        })
    }

    pub fn counts(&self) -> Result<DatabaseCounts, FbError> {
        let items = [
            ibase::isc_info_insert_count,
            ibase::isc_info_update_count,
            ibase::isc_info_delete_count,
            ibase::isc_info_read_idx_count,
            ibase::isc_info_read_seq_count,
            ibase::isc_info_end,
        ];
        let rb = self
            .0
            .borrow_mut()
            .info_call("Database::Counts", &items, 1024)?;

        Ok(DatabaseCounts {
            inserts: rb.get_summed_counts(ibase::isc_info_insert_count)?,
            updates: rb.get_summed_counts(ibase::isc_info_update_count)?,
            deletes: rb.get_summed_counts(ibase::isc_info_delete_count)?,
            read_idx: rb.get_summed_counts(ibase::isc_info_read_idx_count)?,
            read_seq: rb.get_summed_counts(ibase::isc_info_read_seq_count)?,
        })
    }

    /// Users attached to the database
    pub fn users(&self) -> Result<Vec<String>, FbError> {
        let items = [ibase::isc_info_user_names, ibase::isc_info_end];
        let rb = self
            .0
            .borrow_mut()
            .info_call("Database::Users", &items, 8000)?;

        let mut users = vec![];
        for value in rb.get_all(ibase::isc_info_user_names)? {
            // A length byte, then the name
            let name = match value.split_first() {
                Some((&len, name)) => &name[..(len as usize).min(name.len())],
                None => continue,
            };
            users.push(String::from_utf8_lossy(name).into_owned());
        }

        Ok(users)
    }

    /// Registers a handler for the event `name`. An outstanding wait is
    /// cancelled, the next [`dispatch_events`](Self::dispatch_events) queues
    /// a new one including the event
    pub fn define_event<H>(&self, name: &str, handler: H) -> Result<(), FbError>
    where
        H: EventHandler + 'static,
    {
        let mut d = self.0.borrow_mut();
        if d.dispatching {
            return Err(FbError::logic(
                "Database::DefineEvent",
                "Events can't change while they are dispatched.",
            ));
        }
        if d.handle == 0 {
            return Err(FbError::logic(
                "Database::DefineEvent",
                "Database is not connected.",
            ));
        }

        d.cancel_events()?;
        d.events
            .get_or_insert_with(Events::new)
            .epb
            .define(name, Box::new(handler))
    }

    /// Cancels the outstanding wait and forgets every event
    pub fn clear_events(&self) -> Result<(), FbError> {
        let mut d = self.0.borrow_mut();
        if d.dispatching {
            return Err(FbError::logic(
                "Database::ClearEvents",
                "Events can't change while they are dispatched.",
            ));
        }

        d.cancel_events()?;
        d.events = None;

        Ok(())
    }

    /// Runs the handlers of the events posted since the last call, then
    /// waits again. Does nothing while a wait is outstanding
    pub fn dispatch_events(&self) -> Result<(), FbError> {
        let mut events = {
            let mut d = self.0.borrow_mut();
            if d.dispatching {
                return Err(FbError::logic(
                    "Database::DispatchEvents",
                    "Events are already being dispatched.",
                ));
            }

            match d.events.as_ref() {
                Some(events) if !events.epb.is_empty() && !events.queued() => {}
                _ => return Ok(()),
            }

            let events = match d.events.take() {
                Some(events) => events,
                None => return Ok(()),
            };
            d.dispatching = true;
            events
        };

        let fired = events.collect().and_then(|_| {
            events
                .epb
                .fire_actions(|handler, name, count| handler.on_event(self, name, count))
        });

        let mut d = self.0.borrow_mut();
        d.dispatching = false;
        // A handler may have disconnected, the events are then gone
        if d.handle != 0 {
            d.events = Some(events);
        }

        let fired = fired?;
        if fired > 0 {
            log::debug!("Dispatched {} event(s)", fired);
        }

        d.queue_events()
    }

    /// Names of the registered events
    pub fn event_names(&self) -> Vec<String> {
        self.0
            .borrow()
            .events
            .as_ref()
            .map(|events| events.epb.names())
            .unwrap_or_default()
    }

    pub(crate) fn client(&self) -> Arc<dyn FbClient> {
        self.0.borrow().client.clone()
    }

    pub(crate) fn handle(&self) -> ibase::isc_db_handle {
        self.0.borrow().handle
    }

    pub(crate) fn same(&self, other: &Database) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    tracking!(
        transactions,
        TransactionImpl,
        attach_transaction,
        forget_transaction,
        detach_transaction,
        "Database::DetachTransaction"
    );
    tracking!(
        statements,
        StatementImpl,
        attach_statement,
        forget_statement,
        detach_statement,
        "Database::DetachStatement"
    );
    tracking!(
        blobs,
        BlobImpl,
        attach_blob,
        forget_blob,
        detach_blob,
        "Database::DetachBlob"
    );
    tracking!(
        arrays,
        ArrayImpl,
        attach_array,
        forget_array,
        detach_array,
        "Database::DetachArray"
    );
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = self.0.borrow();
        f.debug_struct("Database")
            .field("server", &d.server)
            .field("database", &d.database)
            .field("user", &d.user)
            .field("handle", &d.handle)
            .field("dialect", &d.dialect)
            .finish()
    }
}
