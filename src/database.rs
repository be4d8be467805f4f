use std::ops::Deref;

use sqlx::{postgres::PgDatabaseError, PgPool};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PostgresConnection(PgPool);

impl PostgresConnection {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }
}

impl Deref for PostgresConnection {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn violated_constraint<'e>(error: &'e sqlx::Error, code: &str) -> Option<&'e str> {
    let pg_error = error
        .as_database_error()?
        .try_downcast_ref::<PgDatabaseError>()?;

    if pg_error.code() == code {
        pg_error.constraint()
    } else {
        None
    }
}

/// The name of the unique constraint violated by a failed statement, if any.
pub fn unique_violation(error: &sqlx::Error) -> Option<&str> {
    violated_constraint(error, UNIQUE_VIOLATION)
}

/// The name of the foreign key constraint violated by a failed statement, if
/// any.
pub fn foreign_key_violation(error: &sqlx::Error) -> Option<&str> {
    violated_constraint(error, FOREIGN_KEY_VIOLATION)
}
