//!
//! Rust Firebird Client
//!
//! Statement struct tests
//!

mk_tests_default! {
    use crate::{FbError, SqlDataType, Statement, StatementType};
    use crate::tests::fake::{Cell, Column, Script};
    use ibpp_core::ibase;

    const SELECT: &str = "select id, name from customers where id > ?";
    const INSERT: &str = "insert into customers (id, name, city) values (?, ?, ?)";

    fn customers() -> Script {
        Script::select(SELECT)
            .params(vec![Column::int("ID")])
            .columns(vec![
                Column::int("ID").relation("CUSTOMERS").not_null(),
                Column::varchar("NAME", 40).alias("CUSTOMER_NAME").relation("CUSTOMERS"),
            ])
            .rows(vec![
                vec![Cell::Long(1), Cell::Varying(b"Alice".to_vec())],
                vec![Cell::Long(2), Cell::Null],
            ])
            .plan("PLAN (CUSTOMERS INDEX (PK_CUSTOMERS))")
            .affected(2)
    }

    fn insert() -> Script {
        Script::new(INSERT, ibase::isc_info_sql_stmt_insert)
            .params(vec![
                Column::int("ID"),
                Column::varchar("NAME", 40),
                Column::varchar("CITY", 40),
            ])
            .affected(1)
    }

    #[test]
    fn select_and_fetch() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        assert_eq!(StatementType::Select, st.kind());
        assert_eq!(SELECT, st.sql());
        assert_eq!(1, st.parameters());
        assert_eq!(2, st.columns());

        st.set(1, 0)?;
        st.execute()?;

        assert!(st.fetch()?);
        assert_eq!(Some(1), st.get::<i32>(1)?);
        assert_eq!(Some("Alice".to_string()), st.get::<String>(2)?);

        assert!(st.fetch()?);
        assert_eq!(Some(2i64), st.get(1)?);
        assert!(st.is_null(2)?);
        assert_eq!(None, st.get::<String>(2)?);

        assert!(!st.fetch()?);
        assert_eq!(1, fx.fake.calls("dsql_free_statement(close)"));

        // The cursor was freed with the end of the rows
        assert!(st.fetch().unwrap_err().is_logic());

        // Prepared still, ready for another run
        st.execute()?;
        assert!(st.fetch()?);

        let state = fx.fake.state();
        assert_eq!(2, state.executions.len());
        assert_eq!(vec![Cell::Long(0)], state.executions[0].1);

        Ok(())
    }

    #[test]
    fn fetch_row_is_independent() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        st.set(1, 0)?;
        st.execute()?;

        let first = st.fetch_row()?.expect("first row");
        let second = st.fetch_row()?.expect("second row");
        assert!(st.fetch_row()?.is_none());

        assert_eq!(Some(1), first.get::<i32>(1)?);
        assert_eq!(Some("Alice".to_string()), first.get::<String>(2)?);
        assert_eq!(Some(2), second.get::<i32>(1)?);
        assert!(second.is_null(2)?);

        Ok(())
    }

    #[test]
    fn all_parameters_must_be_set() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(insert());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, INSERT)?;
        assert_eq!(3, st.parameters());

        st.set(1, 10)?;
        st.set(2, "Bob")?;

        let err = st.execute().unwrap_err();
        assert!(err.is_logic());
        assert_eq!("All parameters must be specified.", err.message());
        assert_eq!(0, fx.fake.calls("dsql_execute2"));

        // Left closed, it must be prepared again
        assert_eq!(0, st.parameters());
        st.prepare(INSERT)?;
        st.set(1, 10)?;
        st.set(2, "Bob")?;
        st.set_null(3)?;
        st.execute()?;

        assert_eq!(1, st.affected_rows()?);

        let state = fx.fake.state();
        assert_eq!(
            vec![Cell::Long(10), Cell::Varying(b"Bob".to_vec()), Cell::Null],
            state.executions[0].1
        );

        Ok(())
    }

    #[test]
    fn parameter_count_ignores_the_estimate() -> Result<(), FbError> {
        let fx = connect();
        // No placeholder in the text, two parameters for the engine
        let sql = "execute procedure add_customer";
        fx.fake.script(
            Script::new(sql, ibase::isc_info_sql_stmt_exec_procedure)
                .params(vec![Column::int("ID"), Column::varchar("NAME", 10)]),
        );
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, sql)?;
        assert_eq!(2, st.parameters());

        st.set(1, 1)?;
        assert!(st.execute().unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn procedure_results_come_with_the_execution() -> Result<(), FbError> {
        let fx = connect();
        let sql = "execute procedure next_id";
        fx.fake.script(
            Script::new(sql, ibase::isc_info_sql_stmt_exec_procedure)
                .columns(vec![Column::int("NEW_ID")])
                .rows(vec![vec![Cell::Long(42)]]),
        );
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, sql)?;
        st.execute()?;

        assert_eq!(Some(42), st.get::<i32>(1)?);
        assert_eq!(1, fx.fake.calls("dsql_execute2"));
        assert_eq!(0, fx.fake.calls("dsql_execute"));
        assert!(st.fetch().unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn column_lookup() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;

        assert_eq!(1, st.column_num("id")?);
        assert_eq!(2, st.column_num("Name")?);
        assert_eq!(2, st.column_num("customer_name")?);
        assert!(st.column_num("city").unwrap_err().is_logic());

        assert_eq!("NAME", st.column_name(2)?);
        assert_eq!("CUSTOMER_NAME", st.column_alias(2)?);
        assert_eq!("CUSTOMERS", st.column_table(1)?);
        assert_eq!(SqlDataType::Integer, st.column_type(1)?);
        assert_eq!(SqlDataType::String, st.column_type(2)?);
        assert_eq!(40, st.column_size(2)?);
        assert_eq!(0, st.column_scale(1)?);
        assert_eq!(SqlDataType::Integer, st.parameter_type(1)?);
        assert_eq!(4, st.parameter_size(1)?);

        for index in [0, 3] {
            assert!(st.column_name(index).unwrap_err().is_logic());
        }

        Ok(())
    }

    #[test]
    fn get_by_name() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        st.set(1, 0)?;
        st.execute()?;
        st.fetch()?;

        assert_eq!(Some("Alice".to_string()), st.get_by_name::<String>("customer_name")?);
        assert!(!st.is_null_by_name("ID")?);

        Ok(())
    }

    #[test]
    fn prepare_preconditions() -> Result<(), FbError> {
        let fx = connect();
        let tr = fx.transaction()?;
        let st = Statement::new(&fx.db, &tr);

        let err = st.prepare("").unwrap_err();
        assert_eq!("SQL statement can't be 0 length.", err.message());

        tr.commit()?;
        let err = st.prepare(SELECT).unwrap_err();
        assert_eq!("Transaction must be started.", err.message());

        Ok(())
    }

    #[test]
    fn failed_prepare_leaves_it_closed() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        let err = st.prepare("select * from nowhere").unwrap_err();
        assert!(err.is_sql());
        assert_eq!(-104, err.sql_code());
        assert_eq!("Statement::Prepare", err.origin());

        assert_eq!(StatementType::Unknown, st.kind());
        assert_eq!(0, st.columns());
        assert!(st.execute().unwrap_err().is_logic());
        // Both engine statements were dropped
        assert_eq!(2, fx.fake.calls("dsql_free_statement(drop)"));

        Ok(())
    }

    #[test]
    fn failed_execute_leaves_it_closed() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(insert());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, INSERT)?;
        st.set(1, 1)?;
        st.set(2, "Carol")?;
        st.set(3, "Lisbon")?;

        fx.fake.fail_next("dsql_execute2", ibase::isc_lock_conflict);
        let err = st.execute().unwrap_err();
        assert_eq!(ibase::isc_lock_conflict, err.engine_code());
        assert!(err.message().contains("fake engine error"));

        assert_eq!(0, st.parameters());
        assert_eq!(1, fx.fake.calls("dsql_free_statement(drop)"));

        Ok(())
    }

    #[test]
    fn failed_fetch_closes() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        st.set(1, 0)?;
        st.execute()?;

        fx.fake.fail_next("dsql_fetch", ibase::isc_io_error);
        assert!(st.fetch().unwrap_err().is_sql());
        assert_eq!(0, st.columns());

        Ok(())
    }

    #[test]
    fn transaction_control_is_rejected() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(Script::new("commit", ibase::isc_info_sql_stmt_commit));
        let tr = fx.transaction()?;

        let st = Statement::new(&fx.db, &tr);
        assert!(st.prepare("commit").unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn plan_and_affected_rows() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        assert_eq!("PLAN (CUSTOMERS INDEX (PK_CUSTOMERS))", st.plan()?);

        st.set(1, 0)?;
        st.execute()?;
        assert_eq!(2, st.affected_rows()?);

        st.close()?;
        assert!(st.plan().unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn ddl_has_no_affected_rows() -> Result<(), FbError> {
        let fx = connect();
        let sql = "create table t (id int)";
        fx.fake.script(Script::new(sql, ibase::isc_info_sql_stmt_ddl));
        let tr = fx.transaction()?;

        let st = Statement::new(&fx.db, &tr);
        st.execute_sql(sql)?;
        assert_eq!(StatementType::Ddl, st.kind());
        assert_eq!(0, st.affected_rows()?);
        // Only the statement type was asked
        assert_eq!(1, fx.fake.calls("dsql_sql_info"));

        Ok(())
    }

    #[test]
    fn named_cursor() -> Result<(), FbError> {
        let fx = connect();
        let sql = "select id from customers for update";
        fx.fake.script(
            Script::new(sql, ibase::isc_info_sql_stmt_select_for_upd)
                .columns(vec![Column::int("ID")])
                .rows(vec![vec![Cell::Long(7)]]),
        );
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::new(&fx.db, &tr);
        st.cursor_execute_sql("CUR_CUSTOMERS", sql)?;
        assert!(st.fetch()?);
        assert_eq!(Some(7), st.get::<i32>(1)?);
        assert_eq!(vec!["CUR_CUSTOMERS".to_string()], fx.fake.state().cursor_names);

        st.prepare(SELECT)?;
        assert!(st.cursor_execute("CUR").unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn execute_immediate() -> Result<(), FbError> {
        let fx = connect();
        let tr = fx.transaction()?;

        let st = Statement::new(&fx.db, &tr);
        st.execute_immediate("delete from customers")?;
        assert_eq!(vec!["delete from customers".to_string()], fx.fake.state().immediate);

        assert!(st.execute_immediate("").unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn statements_over_64kb_are_refused() -> Result<(), FbError> {
        let fx = connect();
        let tr = fx.transaction()?;
        let st = Statement::new(&fx.db, &tr);

        let sql = format!("select 1 from rdb$database where 1 = 1{}", " ".repeat(65536));

        let err = st.prepare(&sql).unwrap_err();
        assert!(err.is_logic());
        assert!(err.message().starts_with("SQL statement too long"));
        assert_eq!(0, fx.fake.calls("dsql_allocate_statement"));

        let err = st.execute_immediate(&sql).unwrap_err();
        assert!(err.is_logic());
        assert!(fx.fake.state().immediate.is_empty());

        Ok(())
    }

    #[test]
    fn detach_from_the_database() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        st.detach_database()?;

        assert!(st.database().is_none());
        assert_eq!(1, fx.fake.calls("dsql_free_statement(drop)"));
        assert!(st.prepare(SELECT).unwrap_err().is_logic());
        assert!(st.detach_database().unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn disconnect_cascades() -> Result<(), FbError> {
        let fx = connect();
        fx.fake.script(customers());
        let tr = fx.transaction()?;

        let st = Statement::with_sql(&fx.db, &tr, SELECT)?;
        fx.db.disconnect()?;

        assert!(!tr.started());
        assert!(st.database().is_none());
        assert_eq!(0, st.columns());
        assert_eq!(1, fx.fake.calls("rollback_transaction"));
        assert!(fx.fake.state().databases.is_empty());

        Ok(())
    }
}
