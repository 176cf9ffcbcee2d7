/// Data Models Module
///
/// Core data structures for the ingestion pipeline: book definitions,
/// block ranges, and the successive shapes an order event passes through
/// (raw log, enriched event, database row).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingestible order book, tied to a single network.
///
/// The book list is supplied externally as a JSON file; this crate never
/// discovers books on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInfo {
    /// Order book contract address (compared case-insensitively).
    pub book_address: String,
    /// Network identifier, e.g. "1" for mainnet.
    pub network_id: String,
    /// Human-readable pair symbol, e.g. "UBI/ETH".
    pub symbol: String,
    /// Companion base token contract for this book.
    pub base_token_address: String,
}

/// Inclusive block interval to ingest.
///
/// An inverted range (`from > to`) is legal and simply yields zero events;
/// it happens whenever the chain has not advanced past the confirmation
/// depth since the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }
}

/// Top-level class of a fetched log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ClientOrder,
    /// Fetched but not yet modeled; maps to zero rows.
    MarketOrder,
}

/// Decoded argument bag of a raw event.
///
/// `max_matches` stays a string here; parsing to an integer happens in the
/// transform stage so an absent value is stored as NULL, never as zero.
#[derive(Debug, Clone)]
pub struct OrderEventArgs {
    pub client: String,
    pub event_type_code: u8,
    pub order_id: String,
    pub max_matches: Option<String>,
}

/// One event as returned by the chain connector, immutable once fetched.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: EventKind,
    pub block_number: u64,
    pub log_index: u32,
    pub transaction_hash: String,
    pub address: String,
    pub args: OrderEventArgs,
}

/// Snapshot of an order's on-chain state at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    pub status_code: u8,
    pub executed_base: String,
    pub executed_counter: String,
}

/// A raw event plus its auxiliary order snapshot and block timestamp.
///
/// The position of an enriched event in its batch always equals the
/// position of the raw event it came from.
#[derive(Debug, Clone)]
pub struct EnrichedEvent {
    pub raw: RawEvent,
    pub order: OrderState,
    pub block_timestamp: DateTime<Utc>,
}

/// Discriminant of a client order event as persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderEventType {
    Create,
    Continue,
    Cancel,
}

impl OrderEventType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Create),
            1 => Some(Self::Continue),
            2 => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::Continue => "Continue",
            Self::Cancel => "Cancel",
        }
    }
}

/// The persisted shape of one client order event.
#[derive(Debug, Clone)]
pub struct OrderEventRow {
    pub book_address: String,
    pub block_timestamp: DateTime<Utc>,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u32,
    pub client_address: String,
    pub event_type: OrderEventType,
    pub order_id: String,
    pub max_matches: Option<i64>,
}
