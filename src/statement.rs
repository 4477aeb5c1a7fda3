//!
//! Rust Firebird Client
//!
//! Preparation and execution of statements
//!

use std::{borrow::Cow, cell::RefCell, rc::Rc, sync::Arc};

use ibpp_core::{
    ibase, Charset, FbClient, FbError, FromValue, IntoValue, ResultBuffer, SqlDataType, Status,
    StatementType,
};

use crate::{
    array::Array,
    blob::Blob,
    database::Database,
    row::{Row, RowContext},
    transaction::Transaction,
};

/// Statement text in the connection charset. Its length travels as 16 bits
pub(crate) fn sql_text<'a>(
    charset: &Charset,
    sql: &'a str,
    origin: &'static str,
) -> Result<Cow<'a, [u8]>, FbError> {
    let text = charset.encode(sql)?;

    if u16::try_from(text.len()).is_err() {
        return Err(FbError::logic(
            origin,
            format!("SQL statement too long ({} bytes, max {}).", text.len(), u16::MAX),
        ));
    }

    Ok(text)
}

pub(crate) struct StatementImpl {
    client: Arc<dyn FbClient>,
    handle: ibase::isc_stmt_handle,
    db: Option<Database>,
    tr: Option<Transaction>,
    sql: String,
    kind: StatementType,
    in_row: Option<Row>,
    out_row: Option<Row>,
    result_set: bool,
}

impl StatementImpl {
    fn db(&self, origin: &'static str) -> Result<&Database, FbError> {
        self.db
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "No Database is attached."))
    }

    fn tr(&self, origin: &'static str) -> Result<&Transaction, FbError> {
        self.tr
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "No Transaction is attached."))
    }

    fn check_prepared(&self, origin: &'static str) -> Result<(), FbError> {
        if self.handle == 0 {
            return Err(FbError::logic(origin, "No statement has been prepared."));
        }
        Ok(())
    }

    /// Drops the engine statement and the rows
    fn close(&mut self) -> Result<(), FbError> {
        self.in_row = None;
        self.out_row = None;
        self.result_set = false;
        self.kind = StatementType::Unknown;

        if self.handle == 0 {
            return Ok(());
        }

        let mut status = Status::default();
        self.client
            .dsql_free_statement(&mut status, &mut self.handle, ibase::DSQL_drop);
        // Left consistent even when the engine call failed
        self.handle = 0;
        status.check(
            self.client.as_ref(),
            "Statement::Close(DSQL_drop)",
            "isc_dsql_free_statement failed.",
        )
    }

    /// Close that can't fail, for the error paths
    fn close_quietly(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Statement cleanup failed: {}", e);
        }
    }

    fn cursor_free(&mut self) -> Result<(), FbError> {
        if !self.result_set {
            return Ok(());
        }
        self.result_set = false;

        if self.handle == 0 {
            return Ok(());
        }

        let mut status = Status::default();
        self.client
            .dsql_free_statement(&mut status, &mut self.handle, ibase::DSQL_close);
        status.check(
            self.client.as_ref(),
            "Statement::CursorFree(DSQL_close)",
            "isc_dsql_free_statement failed.",
        )
    }

    fn prepare(&mut self, sql: &str) -> Result<(), FbError> {
        let db = self.db("Statement::Prepare")?.clone();
        let tr = self.tr("Statement::Prepare")?.clone();

        if !db.connected() {
            return Err(FbError::logic(
                "Statement::Prepare",
                "Database must be connected.",
            ));
        }
        if !tr.started() {
            return Err(FbError::logic(
                "Statement::Prepare",
                "Transaction must be started.",
            ));
        }
        if sql.is_empty() {
            return Err(FbError::logic(
                "Statement::Prepare",
                "SQL statement can't be 0 length.",
            ));
        }

        let charset = db.charset();
        let text = sql_text(&charset, sql, "Statement::Prepare")?;
        let dialect = db.dialect();
        let context = RowContext {
            db: db.clone(),
            tr: tr.clone(),
        };

        let mut status = Status::default();
        let mut db_handle = db.handle();
        let mut tr_handle = tr.handle();

        self.client
            .dsql_allocate_statement(&mut status, &mut db_handle, &mut self.handle);
        status.check(
            self.client.as_ref(),
            "Statement::Prepare",
            "isc_dsql_allocate_statement failed",
        )?;
        self.sql = sql.to_string();

        // First guesses of the descriptor sizes, to avoid describing twice
        let out_guess = (1 + sql.matches(',').count()).min(i16::MAX as usize) as i16;
        let in_guess = sql.matches('?').count().clamp(1, i16::MAX as usize) as i16;

        let mut out_row = Row::new(out_guess, charset.clone(), Some(context.clone()))?;

        status.reset();
        self.client.dsql_prepare(
            &mut status,
            &mut tr_handle,
            &mut self.handle,
            &text,
            dialect,
            out_row.xsqlda_mut(),
        );
        status.check(
            self.client.as_ref(),
            "Statement::Prepare",
            "isc_dsql_prepare failed",
        )?;

        let items = [ibase::isc_info_sql_stmt_type, ibase::isc_info_end];
        let mut rb = ResultBuffer::new(100);
        status.reset();
        self.client
            .dsql_sql_info(&mut status, &mut self.handle, &items, rb.as_mut_bytes());
        status.check(
            self.client.as_ref(),
            "Statement::Prepare",
            "isc_dsql_sql_info failed",
        )?;
        self.kind = StatementType::from_info(rb.get_int(ibase::isc_info_sql_stmt_type)?)?;

        if out_row.needs_resize() {
            let len = out_row.xsqlda().sqld();
            out_row.resize(len)?;

            status.reset();
            self.client
                .dsql_describe(&mut status, &mut self.handle, dialect, out_row.xsqlda_mut());
            status.check(
                self.client.as_ref(),
                "Statement::Prepare",
                "isc_dsql_describe failed",
            )?;
        }
        out_row.allocate_variables()?;

        let mut in_row = Row::new(in_guess, charset, Some(context))?;
        status.reset();
        self.client
            .dsql_describe_bind(&mut status, &mut self.handle, dialect, in_row.xsqlda_mut());
        status.check(
            self.client.as_ref(),
            "Statement::Prepare",
            "isc_dsql_describe_bind failed",
        )?;

        if in_row.needs_resize() {
            let len = in_row.xsqlda().sqld();
            in_row.resize(len)?;

            status.reset();
            self.client
                .dsql_describe_bind(&mut status, &mut self.handle, dialect, in_row.xsqlda_mut());
            status.check(
                self.client.as_ref(),
                "Statement::Prepare",
                "isc_dsql_describe_bind failed",
            )?;
        }
        in_row.allocate_variables()?;

        self.out_row = if out_row.columns() > 0 {
            Some(out_row)
        } else {
            None
        };
        self.in_row = if in_row.columns() > 0 {
            Some(in_row)
        } else {
            None
        };

        log::debug!(
            "Prepared a {:?} statement with {} parameter(s) and {} column(s)",
            self.kind,
            self.in_row.as_ref().map_or(0, Row::columns),
            self.out_row.as_ref().map_or(0, Row::columns)
        );

        Ok(())
    }

    fn execute(&mut self) -> Result<(), FbError> {
        self.check_prepared("Statement::Execute")?;

        if self.in_row.as_ref().map_or(false, Row::missing_values) {
            return Err(FbError::logic(
                "Statement::Execute",
                "All parameters must be specified.",
            ));
        }

        self.cursor_free()?;

        let tr = self.tr("Statement::Execute")?;
        let mut tr_handle = tr.handle();
        let dialect = self.db("Statement::Execute")?.dialect();

        let mut status = Status::default();
        if self.kind.is_select() {
            self.client.dsql_execute(
                &mut status,
                &mut tr_handle,
                &mut self.handle,
                dialect,
                self.in_row.as_mut().map(Row::xsqlda_mut),
            );
            status.check(
                self.client.as_ref(),
                "Statement::Execute",
                "isc_dsql_execute failed",
            )?;

            self.result_set = self.out_row.is_some();
        } else {
            self.client.dsql_execute2(
                &mut status,
                &mut tr_handle,
                &mut self.handle,
                dialect,
                self.in_row.as_mut().map(Row::xsqlda_mut),
                self.out_row.as_mut().map(Row::xsqlda_mut),
            );
            status.check(
                self.client.as_ref(),
                "Statement::Execute",
                "isc_dsql_execute2 failed",
            )?;
        }

        Ok(())
    }

    /// Fetches the next row into `row`, the statement row when `None`
    fn fetch(&mut self, row: Option<&mut Row>) -> Result<bool, FbError> {
        if !self.result_set {
            return Err(FbError::logic(
                "Statement::Fetch",
                "No statement has been executed or no result set available.",
            ));
        }

        let dialect = self.db("Statement::Fetch")?.dialect();
        let target = match (row, self.out_row.as_mut()) {
            (Some(row), _) => row,
            (None, Some(out)) => out,
            (None, None) => {
                return Err(FbError::logic(
                    "Statement::Fetch",
                    "The statement does not return results.",
                ))
            }
        };

        let mut status = Status::default();
        let code = self
            .client
            .dsql_fetch(&mut status, &mut self.handle, dialect, target.xsqlda_mut());

        if code == ibase::FETCH_NO_MORE_ROWS {
            self.cursor_free()?;
            return Ok(false);
        }
        if status.has_errors() {
            let err = status.as_error(
                self.client.as_ref(),
                "Statement::Fetch",
                "isc_dsql_fetch failed.",
            );
            self.close_quietly();
            return Err(err);
        }

        Ok(true)
    }
}

impl Drop for StatementImpl {
    fn drop(&mut self) {
        self.close_quietly();
    }
}

/// A statement of a database, prepared and executed in a transaction.
///
/// Parameter and column indexes are 1-based.
#[derive(Clone)]
pub struct Statement(pub(crate) Rc<RefCell<StatementImpl>>);

impl Statement {
    pub fn new(db: &Database, tr: &Transaction) -> Statement {
        let st = Statement(Rc::new(RefCell::new(StatementImpl {
            client: db.client(),
            handle: 0,
            db: Some(db.clone()),
            tr: Some(tr.clone()),
            sql: String::new(),
            kind: StatementType::Unknown,
            in_row: None,
            out_row: None,
            result_set: false,
        })));

        db.attach_statement(&st.0);
        tr.attach_statement(&st.0);

        st
    }

    /// Statement prepared with `sql`
    pub fn with_sql(db: &Database, tr: &Transaction, sql: &str) -> Result<Statement, FbError> {
        let st = Statement::new(db, tr);
        st.prepare(sql)?;

        Ok(st)
    }

    /// Closes the statement and leaves its database
    pub fn detach_database(&self) -> Result<(), FbError> {
        let db = {
            let mut s = self.0.borrow_mut();
            s.close()?;
            s.db.take()
        };

        match db {
            Some(db) => db.detach_statement(&self.0),
            None => Err(FbError::logic(
                "Statement::DetachDatabase",
                "No Database was attached.",
            )),
        }
    }

    /// Frees the cursor and leaves the transaction
    pub fn detach_transaction(&self) -> Result<(), FbError> {
        let tr = {
            let mut s = self.0.borrow_mut();
            s.cursor_free()?;
            s.tr.take()
        };

        match tr {
            Some(tr) => tr.detach_statement(&self.0),
            None => Err(FbError::logic(
                "Statement::DetachTransaction",
                "No Transaction was attached.",
            )),
        }
    }

    pub fn database(&self) -> Option<Database> {
        self.0.borrow().db.clone()
    }

    pub fn transaction(&self) -> Option<Transaction> {
        self.0.borrow().tr.clone()
    }

    /// Prepares `sql`, closing any previous preparation. On failure the
    /// statement is left closed
    pub fn prepare(&self, sql: &str) -> Result<(), FbError> {
        let mut s = self.0.borrow_mut();
        s.close()?;

        let result = s.prepare(sql);
        if result.is_err() {
            s.close_quietly();
        }

        result
    }

    /// Executes the prepared statement. Every parameter must have been set.
    /// On failure the statement is left closed and must be prepared again
    pub fn execute(&self) -> Result<(), FbError> {
        let mut s = self.0.borrow_mut();

        let result = s.execute();
        if result.is_err() {
            s.close_quietly();
        }

        result
    }

    /// Prepares and executes `sql`
    pub fn execute_sql(&self, sql: &str) -> Result<(), FbError> {
        self.prepare(sql)?;
        self.execute()
    }

    /// Executes a `SELECT ... FOR UPDATE` and names its cursor, for
    /// positioned updates
    pub fn cursor_execute(&self, cursor: &str) -> Result<(), FbError> {
        {
            let s = self.0.borrow();
            s.check_prepared("Statement::CursorExecute")?;

            if s.kind != StatementType::SelectForUpdate || s.out_row.is_none() {
                return Err(FbError::logic(
                    "Statement::CursorExecute",
                    "Cursor name can only be assigned to SELECT FOR UPDATE statements.",
                ));
            }
            if cursor.is_empty() {
                return Err(FbError::logic(
                    "Statement::CursorExecute",
                    "Cursor name can't be 0 length.",
                ));
            }
        }

        self.execute()?;

        let mut s = self.0.borrow_mut();
        let s = &mut *s;
        let mut status = Status::default();
        s.client
            .dsql_set_cursor_name(&mut status, &mut s.handle, cursor);
        status.check(
            s.client.as_ref(),
            "Statement::CursorExecute",
            "isc_dsql_set_cursor_name failed",
        )
    }

    /// Prepares `sql`, then executes it with a named cursor
    pub fn cursor_execute_sql(&self, cursor: &str, sql: &str) -> Result<(), FbError> {
        self.prepare(sql)?;
        self.cursor_execute(cursor)
    }

    /// Executes `sql` without preparing it. Closes the prepared statement
    pub fn execute_immediate(&self, sql: &str) -> Result<(), FbError> {
        let mut s = self.0.borrow_mut();
        s.close()?;

        if sql.is_empty() {
            return Err(FbError::logic(
                "Statement::ExecuteImmediate",
                "SQL statement can't be 0 length.",
            ));
        }

        let db = s.db("Statement::ExecuteImmediate")?;
        let tr = s.tr("Statement::ExecuteImmediate")?;
        if !db.connected() {
            return Err(FbError::logic(
                "Statement::ExecuteImmediate",
                "Database must be connected.",
            ));
        }
        if !tr.started() {
            return Err(FbError::logic(
                "Statement::ExecuteImmediate",
                "Transaction must be started.",
            ));
        }

        let text = sql_text(&db.charset(), sql, "Statement::ExecuteImmediate")?;
        let mut db_handle = db.handle();
        let mut tr_handle = tr.handle();

        let mut status = Status::default();
        s.client.dsql_execute_immediate(
            &mut status,
            &mut db_handle,
            &mut tr_handle,
            &text,
            db.dialect(),
            None,
        );
        status.check(
            s.client.as_ref(),
            "Statement::ExecuteImmediate",
            "isc_dsql_execute_immediate failed",
        )
    }

    /// Fetches the next row into the statement row. False at the end of the
    /// result set, the cursor is then freed.
    ///
    /// Any other failure closes the statement.
    pub fn fetch(&self) -> Result<bool, FbError> {
        self.0.borrow_mut().fetch(None)
    }

    /// Fetches the next row into a new row, independent of the statement
    pub fn fetch_row(&self) -> Result<Option<Row>, FbError> {
        let mut s = self.0.borrow_mut();

        let mut row = match s.out_row.as_ref() {
            Some(out) => out.try_clone()?,
            None => {
                return Err(FbError::logic(
                    "Statement::Fetch",
                    "The statement does not return results.",
                ))
            }
        };

        if s.fetch(Some(&mut row))? {
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    /// Rows affected by the last execution
    pub fn affected_rows(&self) -> Result<i32, FbError> {
        let mut s = self.0.borrow_mut();
        s.check_prepared("Statement::AffectedRows")?;

        let count = match s.kind {
            StatementType::Select | StatementType::SelectForUpdate => {
                ibase::isc_info_req_select_count
            }
            StatementType::Insert => ibase::isc_info_req_insert_count,
            StatementType::Update => ibase::isc_info_req_update_count,
            StatementType::Delete => ibase::isc_info_req_delete_count,
            _ => return Ok(0),
        };

        let items = [ibase::isc_info_sql_records, ibase::isc_info_end];
        let mut rb = ResultBuffer::new(256);

        let s = &mut *s;
        let mut status = Status::default();
        s.client
            .dsql_sql_info(&mut status, &mut s.handle, &items, rb.as_mut_bytes());
        status.check(
            s.client.as_ref(),
            "Statement::AffectedRows",
            "isc_dsql_sql_info failed.",
        )?;

        rb.get_int2(ibase::isc_info_sql_records, count)
    }

    /// Execution plan chosen by the engine
    pub fn plan(&self) -> Result<String, FbError> {
        let mut s = self.0.borrow_mut();
        s.check_prepared("Statement::Plan")?;

        let items = [ibase::isc_info_sql_get_plan, ibase::isc_info_end];
        let mut rb = ResultBuffer::new(4096);

        let s = &mut *s;
        let mut status = Status::default();
        s.client
            .dsql_sql_info(&mut status, &mut s.handle, &items, rb.as_mut_bytes());
        status.check(
            s.client.as_ref(),
            "Statement::Plan",
            "isc_dsql_sql_info failed.",
        )?;

        let plan = rb.get_string(ibase::isc_info_sql_get_plan)?;

        Ok(plan.trim_start_matches('\n').to_string())
    }

    /// Frees the engine statement. Does nothing when not prepared
    pub fn close(&self) -> Result<(), FbError> {
        self.0.borrow_mut().close()
    }

    /// Closes the result set, keeping the preparation
    pub fn cursor_free(&self) -> Result<(), FbError> {
        self.0.borrow_mut().cursor_free()
    }

    pub fn sql(&self) -> String {
        self.0.borrow().sql.clone()
    }

    pub fn kind(&self) -> StatementType {
        self.0.borrow().kind
    }

    /// Count of parameters
    pub fn parameters(&self) -> usize {
        self.0.borrow().in_row.as_ref().map_or(0, Row::columns)
    }

    /// Count of columns
    pub fn columns(&self) -> usize {
        self.0.borrow().out_row.as_ref().map_or(0, Row::columns)
    }

    fn with_columns<R, F>(&self, origin: &'static str, f: F) -> Result<R, FbError>
    where
        F: FnOnce(&Row) -> Result<R, FbError>,
    {
        let s = self.0.borrow();
        let row = s
            .out_row
            .as_ref()
            .ok_or_else(|| FbError::logic(origin, "The statement does not return results."))?;

        f(row)
    }

    fn with_params<R, F>(&self, origin: &'static str, f: F) -> Result<R, FbError>
    where
        F: FnOnce(&mut Row) -> Result<R, FbError>,
    {
        let mut s = self.0.borrow_mut();
        let row = s
            .in_row
            .as_mut()
            .ok_or_else(|| FbError::logic(origin, "The statement does not take parameters."))?;

        f(row)
    }

    /// Value of a column of the current row, `None` when null
    pub fn get<T: FromValue>(&self, index: usize) -> Result<Option<T>, FbError> {
        self.with_columns("Statement::Get", |row| row.get(index))
    }

    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<Option<T>, FbError> {
        self.with_columns("Statement::Get", |row| row.get(row.column_num(name)?))
    }

    pub fn is_null(&self, index: usize) -> Result<bool, FbError> {
        self.with_columns("Statement::IsNull", |row| row.is_null(index))
    }

    pub fn is_null_by_name(&self, name: &str) -> Result<bool, FbError> {
        self.with_columns("Statement::IsNull", |row| row.is_null(row.column_num(name)?))
    }

    pub fn get_blob(&self, index: usize, blob: &Blob) -> Result<bool, FbError> {
        self.with_columns("Statement::Get", |row| row.get_blob(index, blob))
    }

    pub fn get_array(&self, index: usize, array: &Array) -> Result<bool, FbError> {
        self.with_columns("Statement::Get", |row| row.get_array(index, array))
    }

    /// Binds a parameter
    pub fn set<T: IntoValue>(&self, index: usize, value: T) -> Result<(), FbError> {
        self.with_params("Statement::Set", |row| row.set(index, value))
    }

    pub fn set_null(&self, index: usize) -> Result<(), FbError> {
        self.with_params("Statement::SetNull", |row| row.set_null(index))
    }

    pub fn set_blob(&self, index: usize, blob: &Blob) -> Result<(), FbError> {
        self.with_params("Statement::Set", |row| row.set_blob(index, blob))
    }

    pub fn set_array(&self, index: usize, array: &Array) -> Result<(), FbError> {
        self.with_params("Statement::Set", |row| row.set_array(index, array))
    }

    /// Index of a column, by name and then by alias, ignoring the case
    pub fn column_num(&self, name: &str) -> Result<usize, FbError> {
        self.with_columns("Statement::ColumnNum", |row| row.column_num(name))
    }

    pub fn column_name(&self, index: usize) -> Result<String, FbError> {
        self.with_columns("Statement::ColumnName", |row| row.column_name(index))
    }

    pub fn column_alias(&self, index: usize) -> Result<String, FbError> {
        self.with_columns("Statement::ColumnAlias", |row| row.column_alias(index))
    }

    pub fn column_table(&self, index: usize) -> Result<String, FbError> {
        self.with_columns("Statement::ColumnTable", |row| row.column_table(index))
    }

    pub fn column_type(&self, index: usize) -> Result<SqlDataType, FbError> {
        self.with_columns("Statement::ColumnType", |row| row.column_type(index))
    }

    pub fn column_subtype(&self, index: usize) -> Result<i16, FbError> {
        self.with_columns("Statement::ColumnSubtype", |row| row.column_subtype(index))
    }

    pub fn column_size(&self, index: usize) -> Result<usize, FbError> {
        self.with_columns("Statement::ColumnSize", |row| row.column_size(index))
    }

    pub fn column_scale(&self, index: usize) -> Result<i32, FbError> {
        self.with_columns("Statement::ColumnScale", |row| row.column_scale(index))
    }

    pub fn parameter_type(&self, index: usize) -> Result<SqlDataType, FbError> {
        self.with_params("Statement::ParameterType", |row| row.column_type(index))
    }

    pub fn parameter_subtype(&self, index: usize) -> Result<i16, FbError> {
        self.with_params("Statement::ParameterSubtype", |row| row.column_subtype(index))
    }

    pub fn parameter_size(&self, index: usize) -> Result<usize, FbError> {
        self.with_params("Statement::ParameterSize", |row| row.column_size(index))
    }

    pub fn parameter_scale(&self, index: usize) -> Result<i32, FbError> {
        self.with_params("Statement::ParameterScale", |row| row.column_scale(index))
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.borrow();
        f.debug_struct("Statement")
            .field("handle", &s.handle)
            .field("kind", &s.kind)
            .field("sql", &s.sql)
            .finish()
    }
}
