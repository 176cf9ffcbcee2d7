/// Extract Module
///
/// Fetches raw order book events for a resolved block range.
use crate::errors::IngestError;
use crate::models::{BlockRange, BookInfo, RawEvent};
use crate::rpc::ChainConnector;

/// Fetch the raw events of `book` within `range`, ordered by
/// (block number, log index) ascending.
///
/// An empty or inverted range returns zero events without touching the
/// connector. Any connector failure aborts the pass; nothing downstream
/// runs.
pub async fn fetch_events<C>(connector: &C, book: &BookInfo, range: BlockRange) -> Result<Vec<RawEvent>, IngestError>
where
    C: ChainConnector + ?Sized,
{
    if range.is_empty() {
        tracing::debug!("empty range {}..={} for {}, nothing to fetch", range.from, range.to, book.symbol);
        return Ok(Vec::new());
    }

    connector.events_in_range(book, range.from, range.to).await
}
