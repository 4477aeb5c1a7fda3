//!
//! Rust Firebird Client
//!
//! Row conversion tests
//!

mk_tests_default! {
    use crate::{Date, DbKey, FbError, Row, SqlDataType, Time, Timestamp};
    use crate::row::RowContext;
    use crate::tests::fake::{describe, Column};
    use crate::tests::Fixture;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use ibpp_core::ibase::*;
    use rand::Rng;

    fn row(fx: &Fixture, columns: &[Column], ctx: Option<RowContext>) -> Result<Row, FbError> {
        let mut row = Row::new(columns.len() as i16, fx.db.charset(), ctx)?;
        describe(columns, row.xsqlda_mut());
        row.allocate_variables()?;

        Ok(row)
    }

    #[test]
    fn scaled_numbers() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(
            &fx,
            &[
                Column::new("PRICE", SQL_LONG, 4).scale(-2),
                Column::new("TOTAL", SQL_INT64, 8).scale(-4),
            ],
            None,
        )?;

        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let price: f64 = rng.gen_range(-1_000_000.0..1_000_000.0);
            let total: f64 = rng.gen_range(-1_000_000_000.0..1_000_000_000.0);

            row.set(1, price)?;
            row.set(2, total)?;

            let back: f64 = row.get(1)?.unwrap();
            assert!((back - price).abs() <= 0.005 + 1e-9, "{} != {}", back, price);
            let back: f64 = row.get(2)?.unwrap();
            assert!((back - total).abs() <= 0.00005 + 1e-6, "{} != {}", back, total);
        }

        row.set(1, 12.346)?;
        assert_eq!(Some("12.35".to_string()), row.get::<String>(1)?);
        row.set(1, -0.5)?;
        assert_eq!(Some("-0.50".to_string()), row.get::<String>(1)?);

        // Integers are refused both ways on a scaled column
        assert!(row.set(1, 5i32).unwrap_err().is_logic());
        assert!(row.get::<i32>(1).unwrap_err().is_logic());
        assert!(row.get::<i64>(2).unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn integer_ranges() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(
            &fx,
            &[
                Column::new("SMALL", SQL_SHORT, 2),
                Column::int("MEDIUM"),
                Column::new("BIG", SQL_INT64, 8),
            ],
            None,
        )?;

        row.set(1, 300i32)?;
        assert_eq!(Some(300i16), row.get(1)?);
        assert_eq!(Some(300i64), row.get(1)?);

        let err = row.set(1, 70_000i32).unwrap_err();
        assert_eq!("Out of range numeric conversion", err.message());
        assert_eq!("Row::Set", err.origin());

        row.set(3, i64::MAX)?;
        assert!(row.get::<i32>(3).unwrap_err().is_logic());
        assert_eq!(Some(i64::MAX), row.get(3)?);

        row.set(2, 42.6f64)?;
        assert_eq!(Some(43), row.get::<i32>(2)?);
        row.set(2, -42.5f64)?;
        assert_eq!(Some(-43), row.get::<i32>(2)?);

        let err = row.set(2, "forty").unwrap_err();
        assert!(err.is_logic());
        assert!(err.message().starts_with("Incompatible types"));

        Ok(())
    }

    #[test]
    fn text_columns() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(
            &fx,
            &[
                Column::new("CODE", SQL_TEXT, 5),
                Column::varchar("NAME", 10),
                Column::new("FLAG", SQL_TEXT, 1),
            ],
            None,
        )?;

        row.set(1, "ab")?;
        assert_eq!(Some("ab   ".to_string()), row.get(1)?);

        // Truncated to the column length
        row.set(2, "a name longer than ten")?;
        assert_eq!(Some("a name lon".to_string()), row.get(2)?);
        row.set(2, "short")?;
        assert_eq!(Some("short".to_string()), row.get(2)?);
        assert_eq!(Some(b"short".to_vec()), row.get(2)?);

        row.set(3, true)?;
        assert_eq!(Some("T".to_string()), row.get(3)?);
        assert_eq!(Some(true), row.get(3)?);
        row.set(3, "N")?;
        assert_eq!(Some(false), row.get(3)?);
        row.set(3, "Y")?;
        assert_eq!(Some(true), row.get(3)?);

        Ok(())
    }

    #[test]
    fn booleans() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(&fx, &[Column::new("ACTIVE", SQL_BOOLEAN, 1), Column::int("COUNTER")], None)?;

        row.set(1, true)?;
        assert_eq!(Some(true), row.get(1)?);
        assert_eq!(Some("true".to_string()), row.get(1)?);
        assert!(row.get::<i32>(1).unwrap_err().is_logic());

        row.set(2, true)?;
        assert_eq!(Some(1), row.get::<i32>(2)?);
        assert_eq!(Some(true), row.get(2)?);

        Ok(())
    }

    #[test]
    fn db_keys() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(&fx, &[Column::new("DB_KEY", SQL_TEXT, 8).not_null()], None)?;

        let key = DbKey(vec![0, 0, 0, 128, 0, 0, 0, 7]);
        row.set(1, key.clone())?;

        assert_eq!(Some(key), row.get(1)?);
        assert_eq!(8, row.column_size(1)?);

        Ok(())
    }

    #[test]
    fn dates_and_times() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(
            &fx,
            &[
                Column::new("DAY", SQL_TYPE_DATE, 4),
                Column::new("AT", SQL_TYPE_TIME, 4),
                Column::new("STAMP", SQL_TIMESTAMP, 8),
            ],
            None,
        )?;

        row.set(1, Date::from_ymd(2024, 2, 29)?)?;
        assert_eq!(NaiveDate::from_ymd_opt(2024, 2, 29), row.get(1)?);
        assert_eq!(Some("2024-02-29".to_string()), row.get(1)?);
        let ts: Timestamp = row.get(1)?.unwrap();
        assert_eq!(0, ts.time.seconds());

        let at = NaiveTime::from_hms_milli_opt(13, 45, 10, 500).unwrap();
        row.set(2, at)?;
        assert_eq!(Some(at), row.get(2)?);
        let time: Time = row.get(2)?.unwrap();
        assert_eq!((13, 45, 10, 5000), time.hmst());

        // A date alone is midnight
        row.set(3, Date::from_ymd(1899, 12, 31)?)?;
        let midnight: NaiveDateTime = row.get(3)?.unwrap();
        assert_eq!(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap(), midnight);

        let stamp = Timestamp::new(Date::from_ymd(2001, 9, 9)?, Time::from_hms(1, 46, 40)?);
        row.set(3, stamp)?;
        assert_eq!(Some(stamp), row.get(3)?);
        let day: Date = row.get(3)?.unwrap();
        assert_eq!((2001, 9, 9), day.ymd());

        assert!(row.set(2, Date::from_ymd(2001, 9, 9)?).unwrap_err().is_logic());

        Ok(())
    }

    #[test]
    fn nulls() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(&fx, &[Column::int("OPTIONAL"), Column::int("REQUIRED").not_null()], None)?;

        row.set(1, 5)?;
        assert!(!row.is_null(1)?);
        row.set_null(1)?;
        assert!(row.is_null(1)?);
        assert_eq!(None, row.get::<i32>(1)?);

        row.set(1, 6)?;
        assert_eq!(Some(6), row.get::<i32>(1)?);

        let err = row.set_null(2).unwrap_err();
        assert!(err.is_logic());
        assert!(!row.is_null(2)?);

        Ok(())
    }

    #[test]
    fn indexes_and_updates() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(&fx, &[Column::int("A"), Column::int("B")], None)?;

        for index in [0, 3] {
            let err = row.get::<i32>(index).unwrap_err();
            assert_eq!("Variable index out of range.", err.message());
        }
        assert!(row.set(3, 1).is_err());

        assert!(row.missing_values());
        assert!(!row.any_updated());

        row.set(1, 1)?;
        assert!(row.updated(1)?);
        assert!(!row.updated(2)?);
        assert!(row.any_updated());
        assert!(row.missing_values());

        row.set_null(2)?;
        assert!(!row.missing_values());

        Ok(())
    }

    #[test]
    fn column_metadata() -> Result<(), FbError> {
        let fx = connect();
        let row = row(
            &fx,
            &[
                Column::int("ID").relation("CUSTOMERS").not_null(),
                Column::varchar("NAME", 40).alias("CUSTOMER_NAME").relation("CUSTOMERS"),
                Column::new("BALANCE", SQL_INT64, 8).scale(-3),
            ],
            None,
        )?;

        assert_eq!(3, row.columns());
        assert_eq!("NAME", row.column_name(2)?);
        assert_eq!("CUSTOMER_NAME", row.column_alias(2)?);
        assert_eq!("CUSTOMERS", row.column_table(1)?);
        assert_eq!(SqlDataType::Integer, row.column_type(1)?);
        assert_eq!(SqlDataType::String, row.column_type(2)?);
        assert_eq!(SqlDataType::Largeint, row.column_type(3)?);
        assert_eq!(40, row.column_size(2)?);
        assert_eq!(3, row.column_scale(3)?);
        assert_eq!(0, row.column_scale(1)?);

        assert_eq!(2, row.column_num("name")?);
        assert_eq!(2, row.column_num("Customer_Name")?);
        assert_eq!(3, row.column_num("BALANCE")?);
        let err = row.column_num("missing").unwrap_err();
        assert_eq!("Could not find matching column.", err.message());

        Ok(())
    }

    #[test]
    fn clone_and_free() -> Result<(), FbError> {
        let fx = connect();
        let mut row = row(&fx, &[Column::varchar("NAME", 10)], None)?;

        row.set(1, "first")?;
        let copy = row.try_clone()?;
        row.set(1, "second")?;

        assert_eq!(Some("first".to_string()), copy.get(1)?);
        assert_eq!(Some("second".to_string()), row.get(1)?);

        row.free();
        assert_eq!(0, row.columns());
        assert!(row.get::<String>(1).is_err());
        assert_eq!(Some("first".to_string()), copy.get(1)?);

        Ok(())
    }

    #[test]
    fn blob_columns_as_text() -> Result<(), FbError> {
        let fx = connect();
        let tr = fx.transaction()?;
        let ctx = RowContext {
            db: fx.db.clone(),
            tr: tr.clone(),
        };
        let mut row = row(&fx, &[Column::blob("NOTES")], Some(ctx))?;

        row.set(1, "some notes")?;
        assert_eq!(Some("some notes".to_string()), row.get(1)?);
        assert_eq!(Some(b"some notes".to_vec()), row.get(1)?);
        assert_eq!(1, fx.fake.calls("create_blob2"));
        assert_eq!(0, fx.fake.open_blobs());

        row.set_null(1)?;
        assert_eq!(None, row.get::<String>(1)?);

        // Without a database and a transaction the blob can't be transferred
        let mut detached = self::row(&fx, &[Column::blob("NOTES")], None)?;
        assert!(detached.set(1, "text").unwrap_err().is_logic());

        Ok(())
    }
}
