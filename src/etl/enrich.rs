/// Enrich Module
///
/// Augments each raw event with its order snapshot and the timestamp of its
/// containing block. Both sub-steps run with bounded parallelism; results are
/// reassembled in input order, which downstream consumers rely on.
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;

use crate::errors::IngestError;
use crate::models::{BookInfo, EnrichedEvent, RawEvent};
use crate::rpc::ChainConnector;

/// In-flight connector calls per enrichment sub-step.
pub const ENRICH_CONCURRENCY: usize = 3;

/// Enrich `events` in place-preserving order.
///
/// Output length and order are identical to the input regardless of the
/// completion order of the underlying connector calls. The first failing
/// sub-call aborts the whole batch; no partial sequence leaves this stage.
pub async fn enrich_events<C>(
    connector: &C,
    book: &BookInfo,
    events: Vec<RawEvent>,
    concurrency: usize,
) -> Result<Vec<EnrichedEvent>, IngestError>
where
    C: ChainConnector + ?Sized,
{
    if events.is_empty() {
        return Ok(Vec::new());
    }

    // Order snapshots: `buffered` polls up to `concurrency` lookups at once
    // but yields results in submission order.
    let orders = stream::iter(events.iter().map(|ev| connector.order_state(book, &ev.args.order_id)))
        .buffered(concurrency)
        .try_collect::<Vec<_>>()
        .await?;

    // One timestamp lookup per distinct block.
    let mut blocks: Vec<u64> = events.iter().map(|ev| ev.block_number).collect();
    blocks.sort_unstable();
    blocks.dedup();

    let stamps = stream::iter(
        blocks.into_iter().map(|n| async move { connector.block_timestamp(n).await.map(|ts| (n, ts)) }),
    )
    .buffered(concurrency)
    .try_collect::<Vec<_>>()
    .await?;
    let stamp_by_block: HashMap<u64, DateTime<Utc>> = stamps.into_iter().collect();

    events
        .into_iter()
        .zip(orders)
        .map(|(raw, order)| {
            let block_timestamp = stamp_by_block
                .get(&raw.block_number)
                .copied()
                .ok_or_else(|| IngestError::Connector(format!("missing timestamp for block {}", raw.block_number)))?;

            Ok(EnrichedEvent { raw, order, block_timestamp })
        })
        .collect()
}
