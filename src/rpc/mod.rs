/// RPC Client Module
///
/// Chain access boundary for the ingester. `ChainConnector` is the capability
/// set the pipeline consumes; `EthRpcClient` implements it over raw Ethereum
/// JSON-RPC (eth_blockNumber, eth_getLogs, eth_call, eth_getBlockByNumber)
/// using a plain HTTP client with a bounded request timeout.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::IngestError;
use crate::models::{BookInfo, EventKind, OrderEventArgs, OrderState, RawEvent};

/// keccak256 topic of ClientOrderEvent(address,uint8,uint128,uint256)
const CLIENT_ORDER_EVENT_TOPIC: &str = "0x8f6f9cf44b74afa87bcf2f25c8cbb28fcfa48f726c24e994a46b2244f4ee20f8";
/// keccak256 topic of MarketOrderEvent(uint256,uint8,uint128,uint256)
const MARKET_ORDER_EVENT_TOPIC: &str = "0x37e34aed38521993f8024489e48eca8813b49025052312802bbbba0a3b4e1840";

/// Function selector of getOrder(uint128)
const GET_ORDER_SELECTOR: &str = "0xd09ef241";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only chain capabilities consumed by the pipeline.
///
/// Every call is fallible and fail-fast; no retry policy lives at this
/// boundary.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Current head block number of the chain.
    async fn chain_head(&self) -> Result<u64, IngestError>;

    /// Order book events emitted by `book` in `[from, to]` (both inclusive),
    /// ordered by (block number, log index) ascending.
    async fn events_in_range(&self, book: &BookInfo, from: u64, to: u64) -> Result<Vec<RawEvent>, IngestError>;

    /// Current on-chain state of one order of `book`.
    async fn order_state(&self, book: &BookInfo, order_id: &str) -> Result<OrderState, IngestError>;

    /// Wall-clock timestamp of a block.
    async fn block_timestamp(&self, block_number: u64) -> Result<DateTime<Utc>, IngestError>;
}

/// Raw log entry as returned by eth_getLogs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: String,
    log_index: String,
    transaction_hash: String,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

pub struct EthRpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EthRpcClient {
    /// Create a new JSON-RPC client for the given endpoint.
    pub fn new(endpoint: String) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self { http, endpoint })
    }

    #[allow(dead_code)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Test the RPC connection by asking for the head block.
    pub async fn test_connection(&self) -> Result<(), IngestError> {
        self.chain_head().await?;
        Ok(())
    }

    /// Issue one JSON-RPC call and unwrap the result value.
    async fn call(&self, method: &str, params: Value) -> Result<Value, IngestError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self.http.post(&self.endpoint).json(&body).send().await?.json().await?;

        if let Some(err) = response.error {
            return Err(IngestError::Connector(format!("{} failed: {}", method, err.message)));
        }

        response.result.ok_or_else(|| IngestError::Connector(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl ChainConnector for EthRpcClient {
    async fn chain_head(&self) -> Result<u64, IngestError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let head = result.as_str().ok_or_else(|| IngestError::Connector("eth_blockNumber: non-string result".into()))?;

        parse_hex_u64(head)
    }

    async fn events_in_range(&self, book: &BookInfo, from: u64, to: u64) -> Result<Vec<RawEvent>, IngestError> {
        let filter = json!([{
            "address": book.book_address,
            "fromBlock": format!("{:#x}", from),
            "toBlock": format!("{:#x}", to),
            "topics": [[CLIENT_ORDER_EVENT_TOPIC, MARKET_ORDER_EVENT_TOPIC]],
        }]);

        let result = self.call("eth_getLogs", filter).await?;
        let logs: Vec<LogEntry> = serde_json::from_value(result)
            .map_err(|e| IngestError::Connector(format!("eth_getLogs: malformed result: {}", e)))?;

        let mut events = logs.into_iter().map(decode_log).collect::<Result<Vec<_>, _>>()?;
        events.sort_by_key(|ev| (ev.block_number, ev.log_index));

        tracing::debug!("fetched {} events for {} in blocks {}..={}", events.len(), book.symbol, from, to);
        Ok(events)
    }

    async fn order_state(&self, book: &BookInfo, order_id: &str) -> Result<OrderState, IngestError> {
        let id: u128 =
            order_id.parse().map_err(|_| IngestError::Decode(format!("order id {} is not an integer", order_id)))?;
        let data = format!("{}{:064x}", GET_ORDER_SELECTOR, id);

        let params = json!([{ "to": book.book_address, "data": data }, "latest"]);
        let result = self.call("eth_call", params).await?;
        let output = result.as_str().ok_or_else(|| IngestError::Connector("eth_call: non-string result".into()))?;

        Ok(OrderState {
            status_code: word_u8(output, 0, "order status")?,
            executed_base: parse_hex_u128(&data_word(output, 1)?)?.to_string(),
            executed_counter: parse_hex_u128(&data_word(output, 2)?)?.to_string(),
        })
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<DateTime<Utc>, IngestError> {
        let params = json!([format!("{:#x}", block_number), false]);
        let result = self.call("eth_getBlockByNumber", params).await?;

        let timestamp = result
            .get("timestamp")
            .and_then(|t| t.as_str())
            .ok_or_else(|| IngestError::Connector(format!("block {} has no timestamp", block_number)))?;
        let secs = i64::try_from(parse_hex_u64(timestamp)?)
            .map_err(|_| IngestError::Decode(format!("block {} timestamp {} out of range", block_number, timestamp)))?;

        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| IngestError::Connector(format!("block {} timestamp out of range", block_number)))
    }
}

/// Decode one log entry into a raw event.
fn decode_log(log: LogEntry) -> Result<RawEvent, IngestError> {
    let topic0 = log.topics.first().ok_or_else(|| IngestError::Decode("log has no topics".into()))?;

    let (kind, args) = match topic0.as_str() {
        CLIENT_ORDER_EVENT_TOPIC => {
            let client_topic =
                log.topics.get(1).ok_or_else(|| IngestError::Decode("ClientOrderEvent missing client topic".into()))?;
            let event_type_code = word_u8(&log.data, 0, "client order event type")?;
            let order_id = parse_hex_u128(&data_word(&log.data, 1)?)?.to_string();
            // maxMatches is only meaningful for Create/Continue; the cancel
            // path leaves it absent rather than zero.
            let max_matches = if event_type_code == 2 {
                None
            } else {
                Some(parse_hex_u128(&data_word(&log.data, 2)?)?.to_string())
            };

            (
                EventKind::ClientOrder,
                OrderEventArgs { client: topic_address(client_topic)?, event_type_code, order_id, max_matches },
            )
        }
        MARKET_ORDER_EVENT_TOPIC => {
            let event_type_code = word_u8(&log.data, 1, "market order event type")?;
            let order_id = parse_hex_u128(&data_word(&log.data, 2)?)?.to_string();

            (
                EventKind::MarketOrder,
                OrderEventArgs { client: ZERO_ADDRESS.to_string(), event_type_code, order_id, max_matches: None },
            )
        }
        other => return Err(IngestError::Decode(format!("unexpected event topic {}", other))),
    };

    let log_index = parse_hex_u64(&log.log_index)?;

    Ok(RawEvent {
        kind,
        block_number: parse_hex_u64(&log.block_number)?,
        log_index: u32::try_from(log_index)
            .map_err(|_| IngestError::Decode(format!("log index {} out of range", log_index)))?,
        transaction_hash: log.transaction_hash,
        address: log.address,
        args,
    })
}

/// Decode the i-th data word as a u8, failing on anything wider instead of
/// truncating.
fn word_u8(data: &str, i: usize, what: &str) -> Result<u8, IngestError> {
    let value = parse_hex_u64(&data_word(data, i)?)?;

    u8::try_from(value).map_err(|_| IngestError::Decode(format!("{} {:#x} out of range", what, value)))
}

/// Parse a 0x-prefixed hex quantity into a u64.
fn parse_hex_u64(hex: &str) -> Result<u64, IngestError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(digits, 16).map_err(|_| IngestError::Decode(format!("bad hex quantity {}", hex)))
}

/// Parse a 0x-prefixed hex quantity into a u128.
fn parse_hex_u128(hex: &str) -> Result<u128, IngestError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u128::from_str_radix(digits, 16).map_err(|_| IngestError::Decode(format!("bad hex quantity {}", hex)))
}

/// Extract the i-th 32-byte word of an ABI-encoded data blob as 0x-hex.
fn data_word(data: &str, i: usize) -> Result<String, IngestError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let start = i * 64;
    let end = start + 64;

    if digits.len() < end {
        return Err(IngestError::Decode(format!("data too short for word {}", i)));
    }

    Ok(format!("0x{}", &digits[start..end]))
}

/// Extract the address packed into the low 20 bytes of a topic.
fn topic_address(topic: &str) -> Result<String, IngestError> {
    let digits = topic.strip_prefix("0x").unwrap_or(topic);

    if digits.len() != 64 {
        return Err(IngestError::Decode(format!("bad topic {}", topic)));
    }

    Ok(format!("0x{}", &digits[24..]))
}
