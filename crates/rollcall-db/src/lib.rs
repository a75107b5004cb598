//! # Rollcall DB
//!
//! PostgreSQL pool creation, embedded migrations, and helpers for classifying
//! constraint violations.
//!
//! ```ignore
//! use rollcall_db::{init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&database_url, 10).await?;
//! run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use sqlx::PgPool;

/// Connects a pool to `database_url`.
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Applies the migrations embedded from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Name of the violated constraint, if the error carries one.
pub fn constraint_name(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
        assert!(!is_foreign_key_violation(&err));
        assert!(constraint_name(&err).is_none());
    }
}
