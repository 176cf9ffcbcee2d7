/// Database Module
///
/// PostgreSQL storage boundary for the ingester:
/// - Connection pool management and schema migrations
/// - Checkpoint reads and compare-and-swap checkpoint advances
/// - Idempotent client order event inserts
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::errors::IngestError;
use crate::models::OrderEventRow;

/// Persistence capabilities consumed by the pipeline.
///
/// The checkpoint row is the only resource needing cross-process mutual
/// exclusion; it is guarded by compare-and-swap, not locking.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Last block number ingested for a book. Fails with `CheckpointRead`
    /// when the book has no checkpoint row (rows are pre-seeded externally).
    async fn last_block_ingested(&self, book_address: &str) -> Result<u64, IngestError>;

    /// Insert one client order event row. Re-inserting the same
    /// (book, block, log index) is a no-op.
    async fn insert_order_event(&self, row: &OrderEventRow) -> Result<(), IngestError>;

    /// Conditionally advance a book's checkpoint from `old` to `new`.
    /// Fails with `CheckpointConflict` when the stored value no longer
    /// equals `old` (a concurrent process won the race).
    async fn advance_checkpoint(&self, book_address: &str, old: u64, new: u64) -> Result<(), IngestError>;
}

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPoolOptions::new().max_connections(5).connect(database_url).await?;

        Ok(Self { pool })
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), IngestError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| IngestError::Storage(e.into()))?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    /// Test the database connection.
    pub async fn test_connection(&self) -> Result<(), IngestError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;

        Ok(())
    }
}

#[async_trait]
impl EventStore for Database {
    async fn last_block_ingested(&self, book_address: &str) -> Result<u64, IngestError> {
        let row = sqlx::query("SELECT last_block_number_ingested FROM book WHERE book_address = LOWER($1)")
            .bind(book_address)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let last: i64 = row.try_get("last_block_number_ingested")?;
                Ok(last as u64)
            }
            None => Err(IngestError::CheckpointRead {
                book_address: book_address.to_string(),
                reason: "no checkpoint row".to_string(),
            }),
        }
    }

    async fn insert_order_event(&self, row: &OrderEventRow) -> Result<(), IngestError> {
        sqlx::query(
            r#"
            INSERT INTO client_order_event (
                book_address,
                block_timestamp,
                block_number,
                transaction_hash,
                log_index,
                client_address,
                client_order_event_type,
                order_id,
                max_matches
            ) VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (book_address, block_number, log_index) DO NOTHING
            "#,
        )
        .bind(&row.book_address)
        .bind(row.block_timestamp)
        .bind(row.block_number as i64)
        .bind(&row.transaction_hash)
        .bind(row.log_index as i32)
        .bind(&row.client_address)
        .bind(row.event_type.as_str())
        .bind(&row.order_id)
        .bind(row.max_matches)
        .execute(&self.pool)
        .await?;

        tracing::debug!("inserted event at block {} log {} for {}", row.block_number, row.log_index, row.book_address);
        Ok(())
    }

    async fn advance_checkpoint(&self, book_address: &str, old: u64, new: u64) -> Result<(), IngestError> {
        let result = sqlx::query(
            "UPDATE book SET last_block_number_ingested = $1 \
             WHERE book_address = LOWER($2) AND last_block_number_ingested = $3",
        )
        .bind(new as i64)
        .bind(book_address)
        .bind(old as i64)
        .execute(&self.pool)
        .await?;

        // Zero matched rows means another process advanced this book first.
        if result.rows_affected() == 0 {
            return Err(IngestError::CheckpointConflict { book_address: book_address.to_string(), expected: old });
        }

        tracing::info!("advanced checkpoint for {} from {} to {}", book_address, old, new);
        Ok(())
    }
}
