//! Market-maker runtime: event loop, tick procedure, fill handling, syncs.
//!
//! Split into logical submodules:
//! - `event_loop`: startup synchronization, the select loop, shutdown
//! - `handlers`: price/fill event handling and the per-tick quote procedure
//! - `sync`: authoritative order/position refresh with bounded retry

mod event_loop;
mod handlers;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::venue::{PriceEvent, Side, TradeLogger, VenueRpc};

use super::config::MakerConfig;
use super::estimator::{FairPriceEstimator, MomentumTracker, VolatilityTracker};
use super::quoting::EnhancedQuoter;
use super::reconcile::OrderReconciler;
use super::throttle::Throttle;
use super::tracking::{OrderCache, PnlLedger, PositionLedger};

/// Maximum age difference for pairing venue and reference samples (ms).
const PAIRING_WINDOW_MS: u64 = 1000;

/// PnL snapshot cadence.
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);

/// Consecutive margin rejections before the operator warning.
const MARGIN_WARN_THRESHOLD: u32 = 5;

/// The market-making engine for a single perpetual market.
///
/// Owns every piece of mutable state; all mutation happens on the task
/// driving [`MarketMaker::run`], so no locking is needed.
pub struct MarketMaker<V: VenueRpc, L: TradeLogger> {
    pub(super) config: MakerConfig,
    pub(super) venue: Arc<V>,
    pub(super) logger: L,

    pub(super) fair: FairPriceEstimator,
    pub(super) volatility: VolatilityTracker,
    pub(super) momentum: MomentumTracker,
    pub(super) position: PositionLedger,
    pub(super) pnl: PnlLedger,
    pub(super) orders: OrderCache,
    pub(super) reconciler: OrderReconciler,
    pub(super) quoter: EnhancedQuoter,
    pub(super) throttle: Throttle,

    /// Latest reference-feed sample.
    pub(super) last_reference: Option<PriceEvent>,
    /// Latest venue book sample.
    pub(super) last_venue_book: Option<PriceEvent>,
    /// Highest event timestamp seen; the engine clock.
    pub(super) now_ms: u64,
    /// First reference timestamp, for warmup accounting.
    pub(super) warmup_start_ms: Option<u64>,

    /// Re-entrancy guard for the tick procedure.
    pub(super) is_updating: bool,
    /// Consecutive margin rejections from the venue.
    pub(super) margin_rejections: u32,
    /// Side to quote next while flat in deep margin fallback.
    pub(super) flat_fallback_side: Side,
    /// Skewed mid of the last tick that reached the venue.
    pub(super) last_quoted_mid: Option<Decimal>,
    /// Spread of the last quote pass, echoed into fill records.
    pub(super) last_spread_bps: f64,
    /// Whether the previous tick saw the position in close mode.
    pub(super) was_close_mode: bool,
    /// An order sync should run at the next opportunity.
    pub(super) force_order_sync: bool,
}

impl<V: VenueRpc, L: TradeLogger> MarketMaker<V, L> {
    pub fn new(config: MakerConfig, venue: Arc<V>, logger: L) -> Self {
        let fair = FairPriceEstimator::new(config.fair_price_window_ms, config.fair_min_samples);
        let volatility = VolatilityTracker::new(config.vol_window_seconds, config.vol_min_samples);
        let momentum =
            MomentumTracker::new(config.momentum_period_seconds, config.momentum_strong_bps);
        let position = PositionLedger::new(config.quoter.close_threshold_usd);
        let pnl = PnlLedger::new(config.risk.clone(), Utc::now().date_naive());
        let reconciler = OrderReconciler::new(Arc::clone(&config.market_id));
        let quoter = EnhancedQuoter::new(config.quoter.clone());
        let throttle = Throttle::new(Duration::from_millis(config.update_throttle_ms));

        Self {
            config,
            venue,
            logger,
            fair,
            volatility,
            momentum,
            position,
            pnl,
            orders: OrderCache::new(),
            reconciler,
            quoter,
            throttle,
            last_reference: None,
            last_venue_book: None,
            now_ms: 0,
            warmup_start_ms: None,
            is_updating: false,
            margin_rejections: 0,
            flat_fallback_side: Side::Bid,
            last_quoted_mid: None,
            last_spread_bps: 0.0,
            was_close_mode: false,
            force_order_sync: false,
        }
    }

    /// Current fair price, if the estimator is warm.
    pub(super) fn current_fair(&self) -> Option<Decimal> {
        let reference = self.last_reference.as_ref()?;
        self.fair.fair_price(self.now_ms, reference.mid)
    }

    /// Venue best bid/ask, if the book stream has produced one.
    pub(super) fn current_bbo(&self) -> Option<(Decimal, Decimal)> {
        self.last_venue_book
            .as_ref()
            .filter(|b| b.best_bid > Decimal::ZERO && b.best_ask > Decimal::ZERO)
            .map(|b| (b.best_bid, b.best_ask))
    }

    /// Whether the warmup period has elapsed.
    pub(super) fn is_warm(&self) -> bool {
        match self.warmup_start_ms {
            Some(start) => self.now_ms.saturating_sub(start) >= self.config.warmup_seconds * 1000,
            None => false,
        }
    }
}
