//! Position, order, and PnL state tracking.

mod orders;
mod pnl;
mod position;

pub use orders::{CachedOrder, OrderCache};
pub use pnl::{FillOutcome, HaltReason, PnlLedger, PnlState, RiskLimits};
pub use position::{AllowedSides, PositionLedger, QuotingContext};
