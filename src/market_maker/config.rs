//! Engine configuration.
//!
//! Strongly typed and deserializable; loading from disk or environment is
//! the collaborator's job. Every field has a default so partial configs
//! stay usable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::quoting::QuoterConfig;
use super::tracking::RiskLimits;

/// Top-level engine configuration for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Market to quote (e.g. "ETH-PERP"). `Arc<str>` for cheap cloning in
    /// hot paths.
    pub market_id: Arc<str>,

    /// Pricing parameters.
    #[serde(default)]
    pub quoter: QuoterConfig,

    /// Hard risk limits.
    #[serde(default)]
    pub risk: RiskLimits,

    /// Seconds of feed data required before the first quote.
    #[serde(default = "default_warmup_seconds")]
    pub warmup_seconds: u64,

    /// Leading+trailing throttle period for quote ticks.
    #[serde(default = "default_update_throttle_ms")]
    pub update_throttle_ms: u64,

    /// Authoritative open-order refresh interval.
    #[serde(default = "default_order_sync_interval_ms")]
    pub order_sync_interval_ms: u64,

    /// STATUS log interval.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    /// Fair-price median lookback.
    #[serde(default = "default_fair_price_window_ms")]
    pub fair_price_window_ms: u64,

    /// Authoritative position refresh interval.
    #[serde(default = "default_position_sync_interval_ms")]
    pub position_sync_interval_ms: u64,

    /// Skip a reconcile when the skewed mid has drifted fewer bps than
    /// this since the last quoted tick. `None` disables the skip.
    #[serde(default)]
    pub reprice_threshold_bps: Option<f64>,

    /// Offset samples required before the fair price is trusted.
    #[serde(default = "default_fair_min_samples")]
    pub fair_min_samples: usize,

    /// Volatility lookback in seconds.
    #[serde(default = "default_vol_window_seconds")]
    pub vol_window_seconds: u64,

    /// Returns required before volatility is reported.
    #[serde(default = "default_vol_min_samples")]
    pub vol_min_samples: usize,

    /// Momentum EMA period in seconds.
    #[serde(default = "default_momentum_period_seconds")]
    pub momentum_period_seconds: u64,

    /// |EMA| above this counts as strong momentum.
    #[serde(default = "default_momentum_strong_bps")]
    pub momentum_strong_bps: f64,
}

fn default_warmup_seconds() -> u64 {
    30
}

fn default_update_throttle_ms() -> u64 {
    500
}

fn default_order_sync_interval_ms() -> u64 {
    30_000
}

fn default_status_interval_ms() -> u64 {
    10_000
}

fn default_fair_price_window_ms() -> u64 {
    120_000
}

fn default_position_sync_interval_ms() -> u64 {
    15_000
}

fn default_fair_min_samples() -> usize {
    25
}

fn default_vol_window_seconds() -> u64 {
    120
}

fn default_vol_min_samples() -> usize {
    20
}

fn default_momentum_period_seconds() -> u64 {
    30
}

fn default_momentum_strong_bps() -> f64 {
    3.0
}

impl MakerConfig {
    /// New config for a market with every tunable at its default.
    pub fn new(market_id: impl Into<Arc<str>>) -> Self {
        Self {
            market_id: market_id.into(),
            quoter: QuoterConfig::default(),
            risk: RiskLimits::default(),
            warmup_seconds: default_warmup_seconds(),
            update_throttle_ms: default_update_throttle_ms(),
            order_sync_interval_ms: default_order_sync_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
            fair_price_window_ms: default_fair_price_window_ms(),
            position_sync_interval_ms: default_position_sync_interval_ms(),
            reprice_threshold_bps: None,
            fair_min_samples: default_fair_min_samples(),
            vol_window_seconds: default_vol_window_seconds(),
            vol_min_samples: default_vol_min_samples(),
            momentum_period_seconds: default_momentum_period_seconds(),
            momentum_strong_bps: default_momentum_strong_bps(),
        }
    }

    /// Emit the startup banner.
    pub fn log_banner(&self) {
        info!(
            target: "basis_maker::core",
            market = %self.market_id,
            base_spread_bps = self.quoter.base_spread_bps,
            max_spread_bps = self.quoter.max_spread_bps,
            levels = self.quoter.levels,
            order_size_usd = %self.quoter.order_size_usd,
            max_position_usd = %self.quoter.max_position_usd,
            close_threshold_usd = %self.quoter.close_threshold_usd,
            max_drawdown_usd = %self.risk.max_drawdown_usd,
            daily_loss_limit_usd = %self.risk.daily_loss_limit_usd,
            update_throttle_ms = self.update_throttle_ms,
            fair_price_window_ms = self.fair_price_window_ms,
            reprice_threshold_bps = ?self.reprice_threshold_bps,
            "starting market maker"
        );
    }
}
