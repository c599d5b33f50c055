#![deny(unreachable_pub)]

//! Automated market-making engine core for a single perpetual-futures
//! market on a central-limit-order-book venue.
//!
//! The engine maintains resting limit orders on both sides of the book
//! around a drift-corrected fair price, skews quotes against inventory,
//! reconciles desired quotes against the venue with chunked atomic
//! batches, and enforces hard PnL risk limits.

mod errors;
mod helpers;
mod prelude;

pub mod market_maker;
pub mod venue;

pub use errors::{Error, VenueErrorKind};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
pub use helpers::{bps_diff, ceil_to_tick, floor_to_lot, floor_to_tick};
pub use market_maker::{
    // Engine and configuration
    init_logging,
    AllowedSides,
    CachedOrder,
    EnhancedQuoter,
    FillOutcome,
    // Produced records
    FillRecord,
    HaltReason,
    LogConfig,
    LogFormat,
    MakerConfig,
    MarketMaker,
    OrderCache,
    // Reconciliation
    OrderReconciler,
    PnlLedger,
    PnlState,
    PositionLedger,
    // Quoting
    Quote,
    QuoteDiagnostics,
    QuoteInputs,
    QuoteMode,
    QuoteSet,
    QuoterConfig,
    QuotingContext,
    ReconcileOutcome,
    RiskLimits,
    SnapshotRecord,
    Throttle,
};
pub use venue::{
    ActionResult, EngineEvent, FillEvent, FillMode, NullTradeLogger, PriceEvent, Side, TradeLogger,
    VenueAction, VenueInfo, VenueOrder, VenueRpc,
};
