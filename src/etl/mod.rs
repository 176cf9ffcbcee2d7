/// ETL Stage Module
///
/// The per-book ingestion stages, in pipeline order:
/// - range: resolve the safe block interval from checkpoint + chain head
/// - extract: fetch raw order book events for the interval
/// - enrich: attach order snapshots and block timestamps, order-preserving
/// - transform: map enriched events to database rows
/// - load: write rows strictly in sequence
pub mod enrich;
pub mod extract;
pub mod load;
pub mod range;
pub mod transform;
