//! PostgreSQL implementation of DebugLogStore.
//!
//! Appends free-text entries to the `webhook_debug_logs` table for
//! post-hoc troubleshooting of webhook deliveries and scan runs.

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::DebugLogStore;
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of the DebugLogStore port.
pub struct PostgresDebugLogStore {
    pool: PgPool,
}

impl PostgresDebugLogStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DebugLogStore for PostgresDebugLogStore {
    async fn append(&self, entry: &str) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO webhook_debug_logs (logs) VALUES ($1)")
            .bind(entry)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to append debug log: {}", e),
                )
            })?;

        Ok(())
    }
}
