//! Wire-adjacent venue types.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side that reduces a signed position.
    pub fn reducing(position_is_long: bool) -> Self {
        if position_is_long {
            Side::Ask
        } else {
            Side::Bid
        }
    }

    /// The opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Fill mode for placed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Reject instead of crossing the book.
    PostOnly,
    /// Standard limit behavior.
    Limit,
}

/// A price observation from one of the two feeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub timestamp_ms: u64,
    pub mid: Decimal,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

/// A fill reported by the venue account stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub market_id: Arc<str>,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// Subaction of an atomic venue batch.
///
/// Place and cancel are distinct variants rather than a record with a
/// discriminator string; the venue serializer dispatches on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueAction {
    Place {
        market_id: Arc<str>,
        side: Side,
        price: Decimal,
        size: Decimal,
        fill_mode: FillMode,
        reduce_only: bool,
    },
    Cancel {
        order_id: u64,
    },
}

impl VenueAction {
    /// Whether this action is a cancel.
    pub fn is_cancel(&self) -> bool {
        matches!(self, VenueAction::Cancel { .. })
    }
}

/// Per-subaction result of an atomic batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Order id assigned by the venue for a place; `None` for cancels.
    pub order_id: Option<u64>,
}

/// An open order as reported by the venue's info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueOrder {
    pub market_id: Arc<str>,
    pub order_id: u64,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// Authoritative account state from the venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueInfo {
    pub open_orders: Vec<VenueOrder>,
    /// Signed base position for the traded market (positive = long).
    pub position: Decimal,
}

/// Input to the engine's single-owner event loop.
///
/// Collaborators translate their streams into these and push them on the
/// engine channel; all component mutation happens inside the loop task.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Reference-exchange price update (drives quoting ticks).
    ReferencePrice(PriceEvent),
    /// Target-venue book update.
    VenueBook(PriceEvent),
    /// Fill from the venue account stream.
    Fill(FillEvent),
    /// Operator request to clear a manual/risk halt.
    ResetHalt,
    /// Graceful shutdown request.
    Shutdown,
}
