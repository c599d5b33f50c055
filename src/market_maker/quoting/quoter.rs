//! Inventory-aware quote ladder generation.
//!
//! Produces bid/ask levels around a skewed mid: the spread widens with
//! realized volatility, the mid shifts against inventory, strong momentum
//! pads the adversely-selected side, and sizes taper as the position
//! approaches its cap.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::helpers::{ceil_to_tick, dec_from_f64, f64_from_dec, floor_to_lot, floor_to_tick};
use crate::market_maker::tracking::AllowedSides;
use crate::venue::Side;

/// Level size weights, index by `levels - 1`.
const LEVEL_WEIGHTS: [&[f64]; 3] = [&[1.0], &[0.65, 0.35], &[0.55, 0.30, 0.15]];

/// Momentum magnitude (bps) below which no penalty applies.
const MOMENTUM_PENALTY_GATE_BPS: f64 = 1.5;

/// Adding-side size hits zero above this |position ratio|.
const ADDING_CUTOFF_RATIO: f64 = 0.9;

/// Quoter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoterConfig {
    /// Floor of the quoted spread (bps, full width).
    pub base_spread_bps: f64,
    /// Cap of the quoted spread (bps, full width).
    pub max_spread_bps: f64,
    /// Spread widening per bps of realized volatility.
    pub vol_multiplier: f64,
    /// Inventory skew strength.
    pub skew_factor: f64,
    /// Position cap used for the skew/size ratio.
    pub max_position_usd: Decimal,
    /// |position ratio| where size reduction begins.
    pub size_reduction_start: f64,
    /// Notional at which the adding side is hard-capped to zero.
    pub close_threshold_usd: Decimal,
    /// Ladder levels per side (1..=3).
    pub levels: usize,
    /// Extra distance per deeper level (bps).
    pub level_spacing_bps: f64,
    /// Penalty scale for strong momentum (bps).
    pub momentum_penalty_bps: f64,
    /// Floor for the effective volatility used in skew (bps).
    pub min_skew_bps: f64,
    /// Target notional per level before weighting.
    pub order_size_usd: Decimal,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    /// Maker fee (bps); the spread never quotes below twice this.
    pub maker_fee_bps: f64,
}

impl Default for QuoterConfig {
    fn default() -> Self {
        Self {
            base_spread_bps: 10.0,
            max_spread_bps: 60.0,
            vol_multiplier: 1.0,
            skew_factor: 0.5,
            max_position_usd: dec!(10000),
            size_reduction_start: 0.5,
            close_threshold_usd: dec!(8000),
            levels: 2,
            level_spacing_bps: 4.0,
            momentum_penalty_bps: 4.0,
            min_skew_bps: 5.0,
            order_size_usd: dec!(100),
            tick_size: dec!(0.01),
            lot_size: dec!(0.001),
            maker_fee_bps: 1.5,
        }
    }
}

/// One desired quote.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// Inputs for one quoting pass.
#[derive(Debug, Clone, Copy)]
pub struct QuoteInputs {
    pub fair: Decimal,
    /// Signed position notional at fair.
    pub position_usd: Decimal,
    /// Realized volatility, `None` while warming up.
    pub volatility_bps: Option<f64>,
    /// Signed EMA momentum.
    pub momentum_bps: f64,
    /// Venue best bid/ask, if the book stream has produced one.
    pub bbo: Option<(Decimal, Decimal)>,
    pub allowed_sides: AllowedSides,
}

/// Derived quantities of a quoting pass, for the status line.
#[derive(Debug, Clone, Copy)]
pub struct QuoteDiagnostics {
    pub skewed_mid: Decimal,
    pub spread_bps: f64,
    pub skew_bps: f64,
    pub vol_eff_bps: f64,
    pub position_ratio: f64,
    pub bid_penalty_bps: f64,
    pub ask_penalty_bps: f64,
}

/// Result of a quoting pass.
#[derive(Debug, Clone)]
pub struct QuoteSet {
    pub quotes: Vec<Quote>,
    pub diagnostics: QuoteDiagnostics,
}

/// Ladder quote generator.
#[derive(Debug)]
pub struct EnhancedQuoter {
    config: QuoterConfig,
}

impl EnhancedQuoter {
    pub fn new(config: QuoterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QuoterConfig {
        &self.config
    }

    /// Produce the desired quote set for one tick. May be empty.
    pub fn quotes(&self, inputs: &QuoteInputs) -> QuoteSet {
        let cfg = &self.config;
        let fair = inputs.fair;

        let position_ratio = if cfg.max_position_usd > Decimal::ZERO {
            (f64_from_dec(inputs.position_usd) / f64_from_dec(cfg.max_position_usd))
                .clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let vol_eff = inputs
            .volatility_bps
            .unwrap_or(cfg.base_spread_bps)
            .max(cfg.min_skew_bps);

        let skew_bps = cfg.skew_factor * position_ratio * vol_eff;
        let skewed_mid = fair * (Decimal::ONE - dec_from_f64(skew_bps) / dec!(10000));

        let spread_floor = cfg.base_spread_bps.max(2.0 * cfg.maker_fee_bps);
        let spread_bps = (cfg.base_spread_bps + cfg.vol_multiplier * vol_eff)
            .clamp(spread_floor, cfg.max_spread_bps);

        // Strong momentum pads only the side that would be run over.
        let (bid_penalty_bps, ask_penalty_bps) =
            if inputs.momentum_bps.abs() > MOMENTUM_PENALTY_GATE_BPS {
                let penalty = cfg.momentum_penalty_bps * inputs.momentum_bps.abs() / 5.0;
                if inputs.momentum_bps > 0.0 {
                    (penalty, 0.0)
                } else {
                    (0.0, penalty)
                }
            } else {
                (0.0, 0.0)
            };

        let diagnostics = QuoteDiagnostics {
            skewed_mid,
            spread_bps,
            skew_bps,
            vol_eff_bps: vol_eff,
            position_ratio,
            bid_penalty_bps,
            ask_penalty_bps,
        };

        if fair <= Decimal::ZERO {
            return QuoteSet {
                quotes: Vec::new(),
                diagnostics,
            };
        }

        let (bid_mult, ask_mult) = self.size_multipliers(position_ratio, inputs.position_usd);
        let base_size = floor_to_lot(cfg.order_size_usd / fair, cfg.lot_size);
        let weights = LEVEL_WEIGHTS[cfg.levels.clamp(1, 3) - 1];

        let mut quotes = Vec::with_capacity(weights.len() * 2);
        for (level, weight) in weights.iter().enumerate() {
            let depth_bps = spread_bps / 2.0 + level as f64 * cfg.level_spacing_bps;

            if inputs.allowed_sides.permits(Side::Bid) {
                let offset = dec_from_f64(depth_bps + bid_penalty_bps) / dec!(10000);
                let raw = skewed_mid * (Decimal::ONE - offset);
                let price = self.clamp_bid(floor_to_tick(raw, cfg.tick_size), inputs.bbo);
                let size = floor_to_lot(base_size * dec_from_f64(bid_mult * weight), cfg.lot_size);
                if price > Decimal::ZERO && size > Decimal::ZERO {
                    quotes.push(Quote {
                        side: Side::Bid,
                        price,
                        size,
                    });
                }
            }

            if inputs.allowed_sides.permits(Side::Ask) {
                let offset = dec_from_f64(depth_bps + ask_penalty_bps) / dec!(10000);
                let raw = skewed_mid * (Decimal::ONE + offset);
                let price = self.clamp_ask(ceil_to_tick(raw, cfg.tick_size), inputs.bbo);
                let size = floor_to_lot(base_size * dec_from_f64(ask_mult * weight), cfg.lot_size);
                if price > Decimal::ZERO && size > Decimal::ZERO {
                    quotes.push(Quote {
                        side: Side::Ask,
                        price,
                        size,
                    });
                }
            }
        }

        debug!(
            target: "basis_maker::quoting",
            fair = %fair,
            skewed_mid = %skewed_mid,
            spread_bps = %format!("{spread_bps:.2}"),
            skew_bps = %format!("{skew_bps:.2}"),
            ratio = %format!("{position_ratio:.3}"),
            quotes = quotes.len(),
            "ENHANCED quote pass"
        );

        QuoteSet { quotes, diagnostics }
    }

    /// Size multipliers for the adding and reducing sides, mapped to
    /// (bid, ask) by the sign of the position.
    fn size_multipliers(&self, position_ratio: f64, position_usd: Decimal) -> (f64, f64) {
        let cfg = &self.config;
        let r = position_ratio.abs();
        let start = cfg.size_reduction_start;

        let (mut adding, reducing) = if r <= start {
            (1.0, 1.0)
        } else {
            let ramp = ((r - start) / (1.0 - start)).clamp(0.0, 1.0);
            ((1.0 - 0.8 * ramp).max(0.0), 1.0 + 0.3 * ramp)
        };

        if r > ADDING_CUTOFF_RATIO {
            adding = 0.0;
        }
        if position_usd.abs() >= cfg.close_threshold_usd {
            adding = 0.0;
        }

        // Long: bids add, asks reduce. Short: the reverse.
        if position_ratio >= 0.0 {
            (adding, reducing)
        } else {
            (reducing, adding)
        }
    }

    fn clamp_bid(&self, price: Decimal, bbo: Option<(Decimal, Decimal)>) -> Decimal {
        match bbo {
            Some((_, best_ask)) if best_ask > Decimal::ZERO && price >= best_ask => {
                floor_to_tick(best_ask - self.config.tick_size, self.config.tick_size)
            }
            _ => price,
        }
    }

    fn clamp_ask(&self, price: Decimal, bbo: Option<(Decimal, Decimal)>) -> Decimal {
        match bbo {
            Some((best_bid, _)) if best_bid > Decimal::ZERO && price <= best_bid => {
                ceil_to_tick(best_bid + self.config.tick_size, self.config.tick_size)
            }
            _ => price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QuoterConfig {
        QuoterConfig {
            base_spread_bps: 10.0,
            max_spread_bps: 100.0,
            vol_multiplier: 0.5,
            skew_factor: 0.5,
            max_position_usd: dec!(1000),
            size_reduction_start: 0.5,
            close_threshold_usd: dec!(900),
            levels: 1,
            level_spacing_bps: 5.0,
            momentum_penalty_bps: 4.0,
            min_skew_bps: 5.0,
            order_size_usd: dec!(100),
            tick_size: dec!(0.01),
            lot_size: dec!(0.001),
            maker_fee_bps: 1.0,
        }
    }

    fn inputs(fair: Decimal, position_usd: Decimal) -> QuoteInputs {
        QuoteInputs {
            fair,
            position_usd,
            volatility_bps: Some(10.0),
            momentum_bps: 0.0,
            bbo: None,
            allowed_sides: AllowedSides::Both,
        }
    }

    fn side_quotes(set: &QuoteSet, side: Side) -> Vec<&Quote> {
        set.quotes.iter().filter(|q| q.side == side).collect()
    }

    #[test]
    fn test_flat_position_symmetric_around_fair() {
        // A flat position leaves the mid unskewed.
        let quoter = EnhancedQuoter::new(config());
        let set = quoter.quotes(&inputs(dec!(100), Decimal::ZERO));
        assert_eq!(set.diagnostics.skewed_mid, dec!(100));
        assert_eq!(set.quotes.len(), 2);
        let bid = side_quotes(&set, Side::Bid)[0];
        let ask = side_quotes(&set, Side::Ask)[0];
        assert!(bid.price < dec!(100));
        assert!(ask.price > dec!(100));
    }

    #[test]
    fn test_skew_sign_follows_inventory() {
        // Long skews the mid down, short skews it up.
        let quoter = EnhancedQuoter::new(config());
        let long = quoter.quotes(&inputs(dec!(100), dec!(500)));
        assert!(long.diagnostics.skewed_mid < dec!(100));
        let short = quoter.quotes(&inputs(dec!(100), dec!(-500)));
        assert!(short.diagnostics.skewed_mid > dec!(100));
    }

    #[test]
    fn test_inventory_cap_silences_adding_side() {
        // At +max position only asks are emitted.
        let quoter = EnhancedQuoter::new(config());
        let set = quoter.quotes(&inputs(dec!(100), dec!(1000)));
        assert_eq!(set.diagnostics.position_ratio, 1.0);
        assert!(side_quotes(&set, Side::Bid).is_empty());
        assert!(!side_quotes(&set, Side::Ask).is_empty());
        assert!(set.diagnostics.skewed_mid < dec!(100));
    }

    #[test]
    fn test_close_threshold_hard_cap() {
        let quoter = EnhancedQuoter::new(config());
        // 900 USD = close threshold, ratio 0.9 (not > 0.9): only the hard cap fires.
        let set = quoter.quotes(&inputs(dec!(100), dec!(900)));
        assert!(side_quotes(&set, Side::Bid).is_empty());
    }

    #[test]
    fn test_size_reduction_ramp() {
        let quoter = EnhancedQuoter::new(config());
        // ratio 0.75, start 0.5 -> ramp 0.5: adding 0.6x, reducing 1.15x.
        let set = quoter.quotes(&inputs(dec!(100), dec!(750)));
        let bid = side_quotes(&set, Side::Bid)[0];
        let ask = side_quotes(&set, Side::Ask)[0];
        // base size = 100/100 = 1.0
        assert_eq!(bid.size, dec!(0.6));
        assert_eq!(ask.size, dec!(1.15));
    }

    #[test]
    fn test_tick_and_lot_alignment() {
        let cfg = config();
        let quoter = EnhancedQuoter::new(cfg.clone());
        let mut input = inputs(dec!(123.456789), dec!(123));
        input.volatility_bps = Some(37.3);
        let set = quoter.quotes(&input);
        for q in &set.quotes {
            assert_eq!(q.price % cfg.tick_size, Decimal::ZERO, "price {}", q.price);
            assert_eq!(q.size % cfg.lot_size, Decimal::ZERO, "size {}", q.size);
        }
    }

    #[test]
    fn test_bbo_clamp_never_crosses() {
        // A heavily skewed bid is clamped below the best ask.
        let quoter = EnhancedQuoter::new(config());
        let mut input = inputs(dec!(100), Decimal::ZERO);
        input.bbo = Some((dec!(99.00), dec!(99.02)));
        // Fair far above the venue book: raw ask lands below best bid.
        input.fair = dec!(95);
        let set = quoter.quotes(&input);
        for q in &set.quotes {
            match q.side {
                Side::Bid => assert!(q.price < dec!(99.02)),
                Side::Ask => assert!(q.price > dec!(99.00)),
            }
        }
    }

    #[test]
    fn test_momentum_penalty_one_sided() {
        let quoter = EnhancedQuoter::new(config());
        let mut input = inputs(dec!(100), Decimal::ZERO);
        input.momentum_bps = 5.0;
        let up = quoter.quotes(&input);
        assert!(up.diagnostics.bid_penalty_bps > 0.0);
        assert_eq!(up.diagnostics.ask_penalty_bps, 0.0);
        // penalty = 4.0 * 5/5 = 4 bps
        assert!((up.diagnostics.bid_penalty_bps - 4.0).abs() < 1e-9);

        input.momentum_bps = -5.0;
        let down = quoter.quotes(&input);
        assert_eq!(down.diagnostics.bid_penalty_bps, 0.0);
        assert!(down.diagnostics.ask_penalty_bps > 0.0);

        input.momentum_bps = 1.0;
        let calm = quoter.quotes(&input);
        assert_eq!(calm.diagnostics.bid_penalty_bps, 0.0);
        assert_eq!(calm.diagnostics.ask_penalty_bps, 0.0);
    }

    #[test]
    fn test_spread_floor_covers_fees() {
        let mut cfg = config();
        cfg.maker_fee_bps = 8.0; // 2x fee = 16 > base 10
        cfg.vol_multiplier = 0.0;
        let quoter = EnhancedQuoter::new(cfg);
        let set = quoter.quotes(&inputs(dec!(100), Decimal::ZERO));
        assert!((set.diagnostics.spread_bps - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_spread_cap() {
        let mut cfg = config();
        cfg.vol_multiplier = 100.0;
        let quoter = EnhancedQuoter::new(cfg);
        let mut input = inputs(dec!(100), Decimal::ZERO);
        input.volatility_bps = Some(50.0);
        let set = quoter.quotes(&input);
        assert_eq!(set.diagnostics.spread_bps, 100.0);
    }

    #[test]
    fn test_vol_fallback_to_base_spread() {
        let quoter = EnhancedQuoter::new(config());
        let mut input = inputs(dec!(100), dec!(500));
        input.volatility_bps = None;
        let set = quoter.quotes(&input);
        // vol_eff = max(base_spread=10, min_skew=5) = 10.
        assert_eq!(set.diagnostics.vol_eff_bps, 10.0);
    }

    #[test]
    fn test_three_level_ladder_weights() {
        let mut cfg = config();
        cfg.levels = 3;
        let quoter = EnhancedQuoter::new(cfg);
        let set = quoter.quotes(&inputs(dec!(100), Decimal::ZERO));
        let bids = side_quotes(&set, Side::Bid);
        assert_eq!(bids.len(), 3);
        // base size 1.0; weights 0.55/0.30/0.15.
        assert_eq!(bids[0].size, dec!(0.55));
        assert_eq!(bids[1].size, dec!(0.3));
        assert_eq!(bids[2].size, dec!(0.15));
        // Deeper levels quote further from the mid.
        assert!(bids[0].price > bids[1].price);
        assert!(bids[1].price > bids[2].price);
    }

    #[test]
    fn test_close_mode_sides_respected() {
        let quoter = EnhancedQuoter::new(config());
        let mut input = inputs(dec!(100), dec!(500));
        input.allowed_sides = AllowedSides::AskOnly;
        let set = quoter.quotes(&input);
        assert!(side_quotes(&set, Side::Bid).is_empty());
        assert!(!side_quotes(&set, Side::Ask).is_empty());
    }
}
