//! Database repository for CRUD operations.
//!
//! The operations themselves live next to this file, one module per resource,
//! each adding an `impl Repository` block.

use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::errors::AppError;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Current time as a fixed-width RFC 3339 string, so timestamps sort as text.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a list for a JSON text column.
pub(super) fn to_json_column<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// Turn a unique violation into a conflict with a resource-specific message.
pub(super) fn unique_conflict(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::conflict(message);
        }
    }
    AppError::from(err)
}

/// Map an optional text patch: absent keeps `current`, empty clears it.
pub(super) fn patch_optional(patch: &Option<String>, current: &Option<String>) -> Option<String> {
    match patch {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.clone()),
        None => current.clone(),
    }
}
