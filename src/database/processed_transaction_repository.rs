use crate::database::error::DatabaseError;
use crate::payments::traits::DedupLedger;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

/// Processed transaction ledger row
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE processed_transactions (
///     tx_ref       TEXT PRIMARY KEY,
///     processed_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
#[derive(Debug, Clone, FromRow)]
pub struct ProcessedTransaction {
    pub tx_ref: String,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for the webhook dedup ledger.
///
/// One row per reconciled transaction reference; the primary key is what
/// makes the check-and-mark atomic.
pub struct ProcessedTransactionRepository {
    pool: PgPool,
}

impl ProcessedTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a ledger entry by transaction reference
    pub async fn find_by_tx_ref(
        &self,
        tx_ref: &str,
    ) -> Result<Option<ProcessedTransaction>, DatabaseError> {
        sqlx::query_as::<_, ProcessedTransaction>(
            "SELECT tx_ref, processed_at FROM processed_transactions WHERE tx_ref = $1",
        )
        .bind(tx_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl DedupLedger for ProcessedTransactionRepository {
    async fn mark_if_absent(&self, tx_ref: &str) -> Result<bool, DatabaseError> {
        // Single conditional write: two racing deliveries cannot both see
        // rows_affected = 1.
        let result = sqlx::query(
            "INSERT INTO processed_transactions (tx_ref, processed_at) VALUES ($1, now())
             ON CONFLICT (tx_ref) DO NOTHING",
        )
        .bind(tx_ref)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}
