//! Database connection pool setup and constraint-error mapping.

use crate::error::{AppError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Translate a constraint violation into a business-rule error.
///
/// `messages` maps Postgres constraint names to the message returned to the
/// client. Unique and foreign-key violations on unlisted constraints get a
/// generic message; every other error passes through as a database error.
pub fn map_constraint_error(err: sqlx::Error, messages: &[(&str, &str)]) -> AppError {
    let Some(db_err) = err.as_database_error() else {
        return AppError::Database(err);
    };

    if let Some(constraint) = db_err.constraint() {
        if let Some((_, message)) = messages.iter().find(|(name, _)| *name == constraint) {
            return AppError::BusinessRule((*message).to_string());
        }
    }

    if db_err.is_unique_violation() {
        return AppError::BusinessRule("A record with the same unique value already exists".into());
    }
    if db_err.is_foreign_key_violation() {
        return AppError::BusinessRule(
            "The record is referenced by other records or references a missing record".into(),
        );
    }
    if db_err.is_check_violation() {
        return AppError::BusinessRule("The change violates a data constraint".into());
    }

    AppError::Database(err)
}
