//! Capability interfaces consumed by the engine.
//!
//! The venue SDK, feed websockets, and trade-log writer live outside this
//! crate. The engine sees them only through the traits and event types
//! defined here: price/book/fill events arrive on the engine's channel, and
//! outbound actions go through [`VenueRpc`].

mod types;

pub use types::{
    ActionResult, EngineEvent, FillEvent, FillMode, PriceEvent, Side, VenueAction, VenueInfo,
    VenueOrder,
};

use async_trait::async_trait;

use crate::market_maker::records::{FillRecord, SnapshotRecord};
use crate::prelude::Result;

/// Venue RPC surface.
///
/// `atomic` submits a group of subactions that the venue executes
/// all-or-nothing; `fetch_info` returns the venue's authoritative view of
/// our open orders and position.
#[async_trait]
pub trait VenueRpc: Send + Sync {
    /// Execute a batch of subactions atomically.
    ///
    /// On success the result vector is positionally aligned with `actions`.
    async fn atomic(&self, actions: &[VenueAction]) -> Result<Vec<ActionResult>>;

    /// Fetch open orders and position for this account.
    async fn fetch_info(&self) -> Result<VenueInfo>;
}

/// Sink for the engine's produced records.
///
/// The collaborator behind this trait typically appends JSONL to a per-day
/// file; the engine never buffers records in memory.
pub trait TradeLogger: Send {
    /// Record an executed fill.
    fn log_fill(&mut self, record: &FillRecord);

    /// Record a periodic PnL snapshot.
    fn log_snapshot(&mut self, record: &SnapshotRecord);
}

/// No-op logger for tests and headless runs.
#[derive(Debug, Default)]
pub struct NullTradeLogger;

impl TradeLogger for NullTradeLogger {
    fn log_fill(&mut self, _record: &FillRecord) {}
    fn log_snapshot(&mut self, _record: &SnapshotRecord) {}
}
