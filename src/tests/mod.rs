//! Crate tests and test utils

use std::sync::Arc;

use crate::{Database, FbError, Transaction, TransactionConfiguration};


use fake::FakeClient;

/// Generate copies of tests for multiple engine setups
macro_rules! mk_tests {
    // Base case
    (
        tests {
            $( $tests:tt )*
        }
    ) => {};

    // Recurse for each module
    (
        tests {
            $( $tests:tt )*
        }

        $( #[$attr:meta] )*
        for $name:ident -> $type:ty {
            $( $connect:tt )*
        }

        $( $tail:tt )*
    ) => {
        $( #[$attr] )*
        mod $name {
            $( $tests )*

            fn connect() -> $type {
                $( $connect )*
            }
        }

        mk_tests! {
            tests {
                $( $tests )*
            }
            $( $tail )*
        }
    };
}

/// Generate copies of tests for a dialect 3 and a dialect 1 database
macro_rules! mk_tests_default {
    ( $( $tests:tt )* ) => {
        mk_tests! {
            tests {
                $( $tests )*
            }

            for dialect3 -> crate::tests::Fixture {
                crate::tests::Fixture::connect(3, "UTF8")
                    .expect("Error on connect the test database")
            }

            for dialect1 -> crate::tests::Fixture {
                crate::tests::Fixture::connect(1, "WIN1252")
                    .expect("Error on connect the test database")
            }
        }
    };
}

/// A connected database over a fresh in memory engine
pub struct Fixture {
    pub fake: Arc<FakeClient>,
    pub db: Database,
}

impl Fixture {
    pub fn connect(dialect: i32, charset: &str) -> Result<Self, FbError> {
        let _ = env_logger::builder().is_test(true).try_init();

        let fake = FakeClient::new();
        fake.state().dialect = Some(dialect);

        let db = Database::builder()
            .server("localhost")
            .database("/tmp/ibpp_tests.fdb")
            .user("SYSDBA")
            .password("masterkey")
            .charset(charset)
            .client(fake.clone())
            .build()?;
        db.connect()?;

        Ok(Fixture { fake, db })
    }

    /// A started transaction over the database
    pub fn transaction(&self) -> Result<Transaction, FbError> {
        let tr = Transaction::with_database(&self.db, TransactionConfiguration::default())?;
        tr.start()?;

        Ok(tr)
    }
}

mod events;
mod row;
mod statement;
