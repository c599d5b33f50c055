//! Signed base position with close-mode gating.
//!
//! Fills update the position optimistically; the periodic sync adopts the
//! venue's authoritative value when the two drift apart.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::venue::Side;

/// Drift beyond which the server value is adopted.
const SYNC_DRIFT_TOLERANCE: Decimal = dec!(0.0001);

/// Sides the quoter is allowed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedSides {
    Both,
    BidOnly,
    AskOnly,
}

impl AllowedSides {
    /// Whether quotes on `side` are permitted.
    pub fn permits(self, side: Side) -> bool {
        match self {
            AllowedSides::Both => true,
            AllowedSides::BidOnly => side == Side::Bid,
            AllowedSides::AskOnly => side == Side::Ask,
        }
    }
}

/// Inputs the quoter needs from the position ledger.
#[derive(Debug, Clone, Copy)]
pub struct QuotingContext {
    pub fair: Decimal,
    pub base_size: Decimal,
    pub allowed_sides: AllowedSides,
}

/// Signed base position ledger.
#[derive(Debug)]
pub struct PositionLedger {
    base_size: Decimal,
    close_threshold_usd: Decimal,
    fill_count: usize,
}

impl PositionLedger {
    pub fn new(close_threshold_usd: Decimal) -> Self {
        Self {
            base_size: Decimal::ZERO,
            close_threshold_usd,
            fill_count: 0,
        }
    }

    /// Current signed base position (positive = long).
    pub fn base_size(&self) -> Decimal {
        self.base_size
    }

    /// Fills processed since start.
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    /// Optimistic update from an account-stream fill.
    pub fn apply_fill(&mut self, side: Side, size: Decimal) {
        match side {
            Side::Bid => self.base_size += size,
            Side::Ask => self.base_size -= size,
        }
        self.fill_count += 1;
    }

    /// Adopt the venue's position when it disagrees with ours.
    ///
    /// Returns `true` if drift was detected and the server value adopted.
    pub fn sync_from_server(&mut self, server_position: Decimal) -> bool {
        let drift = (self.base_size - server_position).abs();
        if drift > SYNC_DRIFT_TOLERANCE {
            warn!(
                target: "basis_maker::tracking",
                local = %self.base_size,
                server = %server_position,
                drift = %drift,
                "POS drift detected, adopting server position"
            );
            self.base_size = server_position;
            return true;
        }
        false
    }

    /// Close mode: the position notional at `fair` meets the threshold.
    pub fn is_close_mode(&self, fair: Decimal) -> bool {
        (self.base_size * fair).abs() >= self.close_threshold_usd
    }

    /// Quoting inputs at `fair`; close mode restricts to the reducing side.
    pub fn quoting_context(&self, fair: Decimal) -> QuotingContext {
        let allowed_sides = if self.is_close_mode(fair) {
            if self.base_size > Decimal::ZERO {
                AllowedSides::AskOnly
            } else {
                AllowedSides::BidOnly
            }
        } else {
            AllowedSides::Both
        };
        QuotingContext {
            fair,
            base_size: self.base_size,
            allowed_sides,
        }
    }
}
