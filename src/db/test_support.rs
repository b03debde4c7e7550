//! Database fixtures for tests.
//!
//! Tests that need Postgres call [`connection`] and return early when
//! `TEST_DATABASE_URL` is unset. Each connection runs inside a test
//! transaction that is rolled back when it is dropped.

use crate::db::models::{NewUser, User};
use crate::services::owners;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use std::sync::Once;

static MIGRATE: Once = Once::new();

pub fn connection() -> Option<PgConnection> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        }
    };
    // Tests run in parallel; only one of them may create the schema.
    MIGRATE.call_once(|| {
        let mut conn = PgConnection::establish(&url).expect("connect to TEST_DATABASE_URL");
        conn.run_pending_migrations(crate::MIGRATIONS)
            .expect("apply migrations to test database");
    });
    let mut conn = PgConnection::establish(&url).expect("connect to TEST_DATABASE_URL");
    conn.begin_test_transaction().expect("begin test transaction");
    Some(conn)
}

pub fn user(conn: &mut PgConnection, username: &str) -> User {
    owners::create_user(conn, &NewUser::new(username)).expect("create test user")
}
