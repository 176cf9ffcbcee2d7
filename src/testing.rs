/// Test Support Module
///
/// Mock implementations of the connector and store seams, plus fixture
/// helpers shared by the stage and orchestrator tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::EventStore;
use crate::errors::IngestError;
use crate::models::{BookInfo, EnrichedEvent, EventKind, OrderEventArgs, OrderEventRow, OrderState, RawEvent};
use crate::rpc::ChainConnector;

pub fn test_book(network_id: &str) -> BookInfo {
    BookInfo {
        book_address: "0xAaBbCcDdEeFf00112233445566778899AaBbCcDd".to_string(),
        network_id: network_id.to_string(),
        symbol: "TEST/ETH".to_string(),
        base_token_address: "0x00112233445566778899AaBbCcDdEeFf00112233".to_string(),
    }
}

pub fn client_order_event(block_number: u64, log_index: u32, order_id: &str) -> RawEvent {
    RawEvent {
        kind: EventKind::ClientOrder,
        block_number,
        log_index,
        transaction_hash: format!("0xtx{}x{}", block_number, log_index),
        address: test_book("1").book_address,
        args: OrderEventArgs {
            client: "0x1111111111111111111111111111111111111111".to_string(),
            event_type_code: 0,
            order_id: order_id.to_string(),
            max_matches: Some("3".to_string()),
        },
    }
}

pub fn market_order_event(block_number: u64, log_index: u32, order_id: &str) -> RawEvent {
    RawEvent {
        kind: EventKind::MarketOrder,
        block_number,
        log_index,
        transaction_hash: format!("0xtx{}x{}", block_number, log_index),
        address: test_book("1").book_address,
        args: OrderEventArgs {
            client: "0x0000000000000000000000000000000000000000".to_string(),
            event_type_code: 0,
            order_id: order_id.to_string(),
            max_matches: None,
        },
    }
}

/// Deterministic per-block timestamp shared by mocks and fixtures.
pub fn block_time(block_number: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_600_000_000 + block_number as i64, 0).unwrap()
}

fn order_snapshot(order_id: &str) -> OrderState {
    // Echo the order id into the snapshot so tests can check alignment.
    OrderState { status_code: 1, executed_base: order_id.to_string(), executed_counter: "0".to_string() }
}

/// Enrich a raw event the way MockConnector would.
pub fn enriched(raw: RawEvent) -> EnrichedEvent {
    let order = order_snapshot(&raw.args.order_id);
    let block_timestamp = block_time(raw.block_number);
    EnrichedEvent { raw, order, block_timestamp }
}

/// Scripted chain connector counting every call it receives.
pub struct MockConnector {
    head: u64,
    events: Vec<RawEvent>,
    order_delays_ms: HashMap<String, u64>,
    failing_orders: HashSet<String>,
    calls: AtomicUsize,
    timestamp_calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            events: Vec::new(),
            order_delays_ms: HashMap::new(),
            failing_orders: HashSet::new(),
            calls: AtomicUsize::new(0),
            timestamp_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_events(mut self, events: Vec<RawEvent>) -> Self {
        self.events = events;
        self
    }

    /// Delay order-state lookups for one order id, to force completion
    /// order to differ from submission order.
    pub fn with_order_delay(mut self, order_id: &str, millis: u64) -> Self {
        self.order_delays_ms.insert(order_id.to_string(), millis);
        self
    }

    pub fn with_failing_order(mut self, order_id: &str) -> Self {
        self.failing_orders.insert(order_id.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn timestamp_call_count(&self) -> usize {
        self.timestamp_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    async fn chain_head(&self) -> Result<u64, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head)
    }

    async fn events_in_range(&self, _book: &BookInfo, from: u64, to: u64) -> Result<Vec<RawEvent>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut events: Vec<RawEvent> =
            self.events.iter().filter(|ev| ev.block_number >= from && ev.block_number <= to).cloned().collect();
        events.sort_by_key(|ev| (ev.block_number, ev.log_index));
        Ok(events)
    }

    async fn order_state(&self, _book: &BookInfo, order_id: &str) -> Result<OrderState, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(&millis) = self.order_delays_ms.get(order_id) {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        if self.failing_orders.contains(order_id) {
            return Err(IngestError::Connector(format!("getOrder({}) failed", order_id)));
        }

        Ok(order_snapshot(order_id))
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<DateTime<Utc>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        Ok(block_time(block_number))
    }
}

/// In-memory event store with real compare-and-swap and insert-idempotency
/// semantics, matching what the SQL store provides.
#[derive(Default)]
pub struct MemoryStore {
    checkpoints: Mutex<HashMap<String, u64>>,
    rows: Mutex<Vec<OrderEventRow>>,
    fail_on_insert: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn with_checkpoint(book_address: &str, last_block: u64) -> Self {
        let store = Self::default();
        store.checkpoints.lock().unwrap().insert(book_address.to_lowercase(), last_block);
        store
    }

    /// Fail the first insert attempted while `k` rows are stored (0-based),
    /// then behave normally, so a re-run of the same pass can succeed.
    pub fn failing_at(self, k: usize) -> Self {
        *self.fail_on_insert.lock().unwrap() = Some(k);
        self
    }

    pub fn rows(&self) -> Vec<OrderEventRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn checkpoint(&self, book_address: &str) -> Option<u64> {
        self.checkpoints.lock().unwrap().get(&book_address.to_lowercase()).copied()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn last_block_ingested(&self, book_address: &str) -> Result<u64, IngestError> {
        self.checkpoints.lock().unwrap().get(&book_address.to_lowercase()).copied().ok_or_else(|| {
            IngestError::CheckpointRead {
                book_address: book_address.to_string(),
                reason: "no checkpoint row".to_string(),
            }
        })
    }

    async fn insert_order_event(&self, row: &OrderEventRow) -> Result<(), IngestError> {
        let mut rows = self.rows.lock().unwrap();

        let mut fail_on_insert = self.fail_on_insert.lock().unwrap();
        if *fail_on_insert == Some(rows.len()) {
            *fail_on_insert = None;
            return Err(IngestError::Storage(sqlx::Error::PoolClosed));
        }

        // Same uniqueness key as the SQL store's ON CONFLICT DO NOTHING.
        let duplicate = rows.iter().any(|stored| {
            stored.book_address.eq_ignore_ascii_case(&row.book_address)
                && stored.block_number == row.block_number
                && stored.log_index == row.log_index
        });

        if !duplicate {
            rows.push(row.clone());
        }
        Ok(())
    }

    async fn advance_checkpoint(&self, book_address: &str, old: u64, new: u64) -> Result<(), IngestError> {
        let mut checkpoints = self.checkpoints.lock().unwrap();
        let key = book_address.to_lowercase();

        match checkpoints.get(&key) {
            Some(&current) if current == old => {
                checkpoints.insert(key, new);
                Ok(())
            }
            _ => Err(IngestError::CheckpointConflict { book_address: book_address.to_string(), expected: old }),
        }
    }
}
