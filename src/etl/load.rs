/// Load Module
///
/// Writes enriched events to storage, one row per event, strictly in input
/// order. No transaction spans the batch: if write `i` fails, writes before
/// it stay committed and the checkpoint is not advanced, so the next run
/// re-attempts them (the idempotent insert key makes that harmless).
use crate::db::EventStore;
use crate::errors::IngestError;
use crate::etl::transform;
use crate::models::{BookInfo, EnrichedEvent};

/// Persist `events` in order. Returns the number of rows written; events
/// whose class is not yet modeled are skipped and do not count.
pub async fn persist_events<S>(store: &S, book: &BookInfo, events: &[EnrichedEvent]) -> Result<usize, IngestError>
where
    S: EventStore + ?Sized,
{
    let mut inserted = 0;

    for event in events {
        if let Some(row) = transform::to_order_event_row(book, event)? {
            store.insert_order_event(&row).await?;
            inserted += 1;
        }
    }

    Ok(inserted)
}
