//! Market-making engine for a single perpetual-futures market.
//!
//! Components, leaves first:
//! - `estimator`: fair price, volatility, momentum
//! - `tracking`: position ledger, PnL/risk ledger, order cache
//! - `quoting`: inventory-aware ladder generation
//! - `reconcile`: diff-based atomic order reconciliation
//! - `orchestrator`: the single-owner event loop wiring it all together
//! - `infra`: logging bootstrap
//!
//! The engine consumes its surroundings (venue RPC, feeds, trade log)
//! through the traits in [`crate::venue`].

pub mod config;
pub mod estimator;
pub mod infra;
mod orchestrator;
pub mod quoting;
pub mod reconcile;
pub mod records;
pub mod throttle;
pub mod tracking;

#[cfg(test)]
mod tests;

pub use config::MakerConfig;
pub use infra::{init_logging, LogConfig, LogFormat};
pub use orchestrator::MarketMaker;
pub use quoting::{EnhancedQuoter, Quote, QuoteDiagnostics, QuoteInputs, QuoteSet, QuoterConfig};
pub use reconcile::{OrderReconciler, ReconcileOutcome};
pub use records::{FillRecord, QuoteMode, SnapshotRecord};
pub use throttle::Throttle;
pub use tracking::{
    AllowedSides, CachedOrder, FillOutcome, HaltReason, OrderCache, PnlLedger, PnlState,
    PositionLedger, QuotingContext, RiskLimits,
};
