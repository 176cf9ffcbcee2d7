/// Range Module
///
/// Resolves the safe block interval for one book: from the block after its
/// checkpoint up to the chain head minus a confirmation-depth margin that
/// keeps reorg-prone blocks out of the store.
use crate::db::EventStore;
use crate::errors::IngestError;
use crate::models::{BlockRange, BookInfo};
use crate::rpc::ChainConnector;

/// Most-recent blocks excluded from ingestion to ride out reorgs.
pub const CONFIRMATION_DEPTH: u64 = 16;

/// Resolve the block range to ingest for `book`.
///
/// The result may be inverted (`from > to`) when the chain has not advanced
/// past the confirmation depth since the last run; downstream stages treat
/// that as zero events, not an error. No retry here: any failure aborts the
/// book's pass with its checkpoint untouched.
pub async fn resolve_range<C, S>(
    connector: &C,
    store: &S,
    book: &BookInfo,
    confirmation_depth: u64,
) -> Result<BlockRange, IngestError>
where
    C: ChainConnector + ?Sized,
    S: EventStore + ?Sized,
{
    let last_ingested = store.last_block_ingested(&book.book_address).await?;
    let head = connector.chain_head().await?;

    Ok(BlockRange { from: last_ingested + 1, to: head.saturating_sub(confirmation_depth) })
}
