/// Transform Module
///
/// Maps enriched events to their persisted row shape. Client order events map
/// 1:1; market order events are recognized but not yet modeled and map to zero
/// rows.
use crate::errors::IngestError;
use crate::models::{BookInfo, EnrichedEvent, EventKind, OrderEventRow, OrderEventType};

/// Map one enriched event to zero-or-one database row.
///
/// `max_matches` is parsed as an integer when present and stays NULL when
/// absent; zero is never used as an absence marker.
pub fn to_order_event_row(book: &BookInfo, event: &EnrichedEvent) -> Result<Option<OrderEventRow>, IngestError> {
    match event.raw.kind {
        EventKind::MarketOrder => Ok(None),
        EventKind::ClientOrder => {
            let event_type = OrderEventType::from_code(event.raw.args.event_type_code).ok_or_else(|| {
                IngestError::Decode(format!("unknown client order event type code {}", event.raw.args.event_type_code))
            })?;

            let max_matches = event
                .raw
                .args
                .max_matches
                .as_deref()
                .map(|raw| {
                    raw.parse::<i64>().map_err(|_| IngestError::Decode(format!("bad max_matches value {}", raw)))
                })
                .transpose()?;

            // TODO: persist the order snapshot once the row grows columns
            // for executed amounts; it is already fetched and attached.
            Ok(Some(OrderEventRow {
                book_address: book.book_address.clone(),
                block_timestamp: event.block_timestamp,
                block_number: event.raw.block_number,
                transaction_hash: event.raw.transaction_hash.clone(),
                log_index: event.raw.log_index,
                client_address: event.raw.args.client.clone(),
                event_type,
                order_id: event.raw.args.order_id.clone(),
                max_matches,
            }))
        }
    }
}
