//! PnL and risk ledger.
//!
//! Average-entry cost-basis accounting over fills, realized/unrealized PnL,
//! peak/drawdown tracking, daily-loss accounting with UTC rollover, and the
//! hard halt signal the main loop obeys.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::venue::Side;

/// Hard risk limits. Breaching any of them halts quoting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    pub max_drawdown_usd: Decimal,
    pub max_position_usd: Decimal,
    pub daily_loss_limit_usd: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_drawdown_usd: dec!(500),
            max_position_usd: dec!(10000),
            daily_loss_limit_usd: dec!(500),
        }
    }
}

/// Why the ledger halted.
#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    MaxDrawdown { drawdown: Decimal, limit: Decimal },
    MaxPosition { notional: Decimal, limit: Decimal },
    DailyLoss { total: Decimal, limit: Decimal },
    Manual { reason: String },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::MaxDrawdown { drawdown, limit } => {
                write!(f, "Max drawdown: ${drawdown:.2} >= ${limit:.2}")
            }
            HaltReason::MaxPosition { notional, limit } => {
                write!(f, "Max position: ${notional:.2} >= ${limit:.2}")
            }
            HaltReason::DailyLoss { total, limit } => {
                write!(f, "Daily loss limit: ${total:.2} <= -${limit:.2}")
            }
            HaltReason::Manual { reason } => write!(f, "Manual halt: {reason}"),
        }
    }
}

/// Point-in-time ledger state, marked at a fair price.
#[derive(Debug, Clone)]
pub struct PnlState {
    pub position_base: Decimal,
    pub avg_entry_price: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    pub peak_pnl: Decimal,
    pub drawdown: Decimal,
    pub daily_pnl: Decimal,
    pub daily_start_date: NaiveDate,
    pub win_count: u64,
    pub loss_count: u64,
    pub trade_count: u64,
    pub volume_usd: Decimal,
    pub halted: bool,
    pub halt_reason: Option<HaltReason>,
}

/// Outcome of applying one fill.
#[derive(Debug, Clone, Copy)]
pub struct FillOutcome {
    /// PnL realized by the closing portion of this fill (zero if opening).
    pub realized: Decimal,
    /// Whether the fill tripped a risk halt.
    pub halted: bool,
}

/// Average-entry PnL ledger with risk-halt evaluation.
#[derive(Debug)]
pub struct PnlLedger {
    limits: RiskLimits,
    position_base: Decimal,
    /// `|position_base| × avg_entry_price`; non-negative by construction.
    cost_basis: Decimal,
    realized_pnl: Decimal,
    peak_pnl: Decimal,
    daily_pnl: Decimal,
    daily_start_date: NaiveDate,
    win_count: u64,
    loss_count: u64,
    trade_count: u64,
    volume_usd: Decimal,
    halted: bool,
    halt_reason: Option<HaltReason>,
    seeded: bool,
}

impl PnlLedger {
    pub fn new(limits: RiskLimits, today: NaiveDate) -> Self {
        Self {
            limits,
            position_base: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            peak_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            daily_start_date: today,
            win_count: 0,
            loss_count: 0,
            trade_count: 0,
            volume_usd: Decimal::ZERO,
            halted: false,
            halt_reason: None,
            seeded: false,
        }
    }

    /// Seed with a pre-existing venue position at the first known fair.
    ///
    /// Entry at the seed price makes the initial unrealized PnL ≈ 0, so a
    /// restart does not inherit phantom gains or losses.
    pub fn seed(&mut self, server_position: Decimal, entry_price: Decimal) {
        if self.seeded {
            return;
        }
        self.seeded = true;
        if server_position.is_zero() {
            return;
        }
        self.position_base = server_position;
        self.cost_basis = server_position.abs() * entry_price;
        info!(
            target: "basis_maker::tracking",
            position = %server_position,
            entry = %entry_price,
            "PNL ledger seeded from venue position"
        );
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        self.halt_reason.as_ref()
    }

    pub fn position_base(&self) -> Decimal {
        self.position_base
    }

    /// Clear any halt. Operator action; daily-loss halts also clear
    /// automatically at UTC rollover.
    pub fn reset_halt(&mut self) {
        if let Some(reason) = self.halt_reason.take() {
            info!(target: "basis_maker::risk", %reason, "halt cleared by reset");
        }
        self.halted = false;
    }

    /// Manually halt (operator or supervising task).
    pub fn halt_manual(&mut self, reason: impl Into<String>) {
        if !self.halted {
            self.trip(HaltReason::Manual {
                reason: reason.into(),
            });
        }
    }

    /// Zero daily fields when the UTC date rolls over.
    ///
    /// A halt clears here if and only if its reason was the daily loss
    /// limit; drawdown and position halts persist.
    pub fn roll_daily(&mut self, today: NaiveDate) {
        if today == self.daily_start_date {
            return;
        }
        info!(
            target: "basis_maker::tracking",
            from = %self.daily_start_date,
            to = %today,
            daily_pnl = %self.daily_pnl,
            "UTC day rollover, daily PnL reset"
        );
        self.daily_start_date = today;
        self.daily_pnl = Decimal::ZERO;
        if matches!(self.halt_reason, Some(HaltReason::DailyLoss { .. })) {
            self.halted = false;
            self.halt_reason = None;
            info!(target: "basis_maker::risk", "daily-loss halt cleared at rollover");
        }
    }

    /// Adopt the venue's position when the local copy has drifted.
    ///
    /// The existing average entry is kept where one exists; a position
    /// appearing from flat is costed at `fallback_entry` (the current
    /// mark), the same convention as seeding.
    pub fn sync_position(&mut self, server_position: Decimal, fallback_entry: Decimal) {
        if (self.position_base - server_position).abs() <= dec!(0.0001) {
            return;
        }
        let entry = if self.position_base.is_zero() {
            fallback_entry
        } else {
            self.avg_entry_price()
        };
        warn!(
            target: "basis_maker::tracking",
            local = %self.position_base,
            server = %server_position,
            entry = %entry,
            "PNL ledger adopting server position"
        );
        self.position_base = server_position;
        self.cost_basis = server_position.abs() * entry;
    }

    /// Average entry price of the open position, zero when flat.
    pub fn avg_entry_price(&self) -> Decimal {
        if self.position_base.is_zero() {
            Decimal::ZERO
        } else {
            self.cost_basis / self.position_base.abs()
        }
    }

    /// Mark-to-market PnL of the open position at `fair`.
    pub fn unrealized_pnl(&self, fair: Decimal) -> Decimal {
        if self.position_base.is_zero() {
            return Decimal::ZERO;
        }
        let avg_entry = self.avg_entry_price();
        if self.position_base > Decimal::ZERO {
            self.position_base * (fair - avg_entry)
        } else {
            self.position_base.abs() * (avg_entry - fair)
        }
    }

    /// Apply one fill. `today` is the current UTC date.
    pub fn apply_fill(
        &mut self,
        side: Side,
        price: Decimal,
        size: Decimal,
        today: NaiveDate,
    ) -> FillOutcome {
        self.roll_daily(today);

        let signed = match side {
            Side::Bid => size,
            Side::Ask => -size,
        };

        let opening = self.position_base.is_zero()
            || (self.position_base > Decimal::ZERO) == (signed > Decimal::ZERO);

        let mut realized = Decimal::ZERO;
        if opening {
            self.cost_basis += size * price;
            self.position_base += signed;
        } else {
            let avg_entry = self.avg_entry_price();
            let closing = size.min(self.position_base.abs());
            realized = if self.position_base > Decimal::ZERO {
                closing * (price - avg_entry)
            } else {
                closing * (avg_entry - price)
            };

            // Move toward zero and re-cost the remainder at the old entry.
            if self.position_base > Decimal::ZERO {
                self.position_base -= closing;
            } else {
                self.position_base += closing;
            }
            self.cost_basis = self.position_base.abs() * avg_entry;

            // Overshoot opens a fresh position at the fill price.
            let remainder = size - closing;
            if remainder > Decimal::ZERO {
                self.position_base = if signed > Decimal::ZERO {
                    remainder
                } else {
                    -remainder
                };
                self.cost_basis = remainder * price;
            }

            if realized > Decimal::ZERO {
                self.win_count += 1;
            } else if realized < Decimal::ZERO {
                self.loss_count += 1;
            }
        }

        self.realized_pnl += realized;
        self.daily_pnl += realized;
        self.trade_count += 1;
        self.volume_usd += size * price;

        let halted = self.evaluate_risk(price);
        FillOutcome {
            realized,
            halted: halted || self.halted,
        }
    }

    /// Snapshot at `fair`, updating peak and drawdown, and re-evaluating
    /// the drawdown and daily-loss limits against the mark.
    pub fn get_state(&mut self, fair: Decimal, today: NaiveDate) -> PnlState {
        self.roll_daily(today);
        self.evaluate_risk(fair);
        let unrealized = self.unrealized_pnl(fair);
        let total = self.realized_pnl + unrealized;
        // evaluate_risk already folded the mark into the peak.
        let drawdown = (self.peak_pnl - total).max(Decimal::ZERO);
        PnlState {
            position_base: self.position_base,
            avg_entry_price: self.avg_entry_price(),
            realized_pnl: self.realized_pnl,
            unrealized_pnl: unrealized,
            total_pnl: total,
            peak_pnl: self.peak_pnl,
            drawdown,
            daily_pnl: self.daily_pnl,
            daily_start_date: self.daily_start_date,
            win_count: self.win_count,
            loss_count: self.loss_count,
            trade_count: self.trade_count,
            volume_usd: self.volume_usd,
            halted: self.halted,
            halt_reason: self.halt_reason.clone(),
        }
    }

    /// Evaluate halt conditions at `price`. Returns `true` if this call
    /// tripped the halt. A tripped halt is sticky: later breaches do not
    /// overwrite the original reason.
    fn evaluate_risk(&mut self, price: Decimal) -> bool {
        let unrealized = self.unrealized_pnl(price);
        let total = self.realized_pnl + unrealized;
        self.peak_pnl = self.peak_pnl.max(total);
        if self.halted {
            return false;
        }

        let drawdown = (self.peak_pnl - total).max(Decimal::ZERO);
        if drawdown >= self.limits.max_drawdown_usd {
            self.trip(HaltReason::MaxDrawdown {
                drawdown,
                limit: self.limits.max_drawdown_usd,
            });
            return true;
        }

        let notional = (self.position_base * price).abs();
        if notional >= self.limits.max_position_usd {
            self.trip(HaltReason::MaxPosition {
                notional,
                limit: self.limits.max_position_usd,
            });
            return true;
        }

        let daily_total = self.daily_pnl + unrealized;
        if daily_total <= -self.limits.daily_loss_limit_usd {
            self.trip(HaltReason::DailyLoss {
                total: daily_total,
                limit: self.limits.daily_loss_limit_usd,
            });
            return true;
        }
        false
    }

    fn trip(&mut self, reason: HaltReason) {
        warn!(target: "basis_maker::risk", %reason, "RISK HALT");
        self.halted = true;
        self.halt_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_drawdown_usd: dec!(1000000),
            max_position_usd: dec!(1000000),
            daily_loss_limit_usd: dec!(1000000),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_open_close_long_realizes_spread() {
        // Buy 0.1 @ 99.95, sell 0.1 @ 100.05 -> +$0.01, one win.
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(99.95), dec!(0.1), day("2026-08-01"));
        let out = ledger.apply_fill(Side::Ask, dec!(100.05), dec!(0.1), day("2026-08-01"));
        assert_eq!(out.realized, dec!(0.010));
        let state = ledger.get_state(dec!(100), day("2026-08-01"));
        assert_eq!(state.position_base, Decimal::ZERO);
        assert_eq!(state.realized_pnl, dec!(0.010));
        assert_eq!(state.win_count, 1);
        assert_eq!(state.trade_count, 2);
    }

    #[test]
    fn test_overshoot_close_flips_position() {
        // Long 0.1 @ 100, sell 0.15 @ 101 -> realize $0.10, short 0.05 @ 101.
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(0.1), day("2026-08-01"));
        let out = ledger.apply_fill(Side::Ask, dec!(101), dec!(0.15), day("2026-08-01"));
        assert_eq!(out.realized, dec!(0.10));
        assert_eq!(ledger.position_base(), dec!(-0.05));
        assert_eq!(ledger.avg_entry_price(), dec!(101));
        // cost_basis = 0.05 * 101 = 5.05
        let state = ledger.get_state(dec!(101), day("2026-08-01"));
        assert_eq!(state.position_base * dec!(-1) * dec!(101), dec!(5.05));
    }

    #[test]
    fn test_partial_close_keeps_entry() {
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        ledger.apply_fill(Side::Ask, dec!(102), dec!(0.4), day("2026-08-01"));
        assert_eq!(ledger.position_base(), dec!(0.6));
        assert_eq!(ledger.avg_entry_price(), dec!(100));
        assert_eq!(ledger.unrealized_pnl(dec!(102)), dec!(1.2));
    }

    #[test]
    fn test_short_side_accounting() {
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Ask, dec!(100), dec!(1), day("2026-08-01"));
        assert_eq!(ledger.position_base(), dec!(-1));
        assert_eq!(ledger.unrealized_pnl(dec!(99)), dec!(1));
        let out = ledger.apply_fill(Side::Bid, dec!(99), dec!(1), day("2026-08-01"));
        assert_eq!(out.realized, dec!(1));
        assert_eq!(ledger.position_base(), Decimal::ZERO);
    }

    #[test]
    fn test_round_trip_conserves_pnl() {
        // Fills returning to flat realize exactly the matched spread.
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(0.5), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(101), dec!(0.5), day("2026-08-01"));
        // avg entry = 100.5, sell everything at 102.
        ledger.apply_fill(Side::Ask, dec!(102), dec!(1), day("2026-08-01"));
        assert_eq!(ledger.position_base(), Decimal::ZERO);
        assert_eq!(ledger.get_state(dec!(102), day("2026-08-01")).realized_pnl, dec!(1.5));
    }

    #[test]
    fn test_peak_monotone_and_drawdown_non_negative() {
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        let s1 = ledger.get_state(dec!(103), day("2026-08-01"));
        assert_eq!(s1.peak_pnl, dec!(3));
        let s2 = ledger.get_state(dec!(101), day("2026-08-01"));
        assert_eq!(s2.peak_pnl, dec!(3));
        assert_eq!(s2.drawdown, dec!(2));
        let s3 = ledger.get_state(dec!(105), day("2026-08-01"));
        assert!(s3.peak_pnl >= s2.peak_pnl);
        assert_eq!(s3.drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_drawdown_halt() {
        // Peak $3, mark drops to -$2.5 -> drawdown $5.5 >= $5.
        let mut limits = limits();
        limits.max_drawdown_usd = dec!(5);
        let mut ledger = PnlLedger::new(limits, day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        let up = ledger.get_state(dec!(103), day("2026-08-01"));
        assert!(!up.halted);
        let down = ledger.get_state(dec!(97.5), day("2026-08-01"));
        assert!(down.halted);
        let reason = down.halt_reason.unwrap().to_string();
        assert!(reason.contains("Max drawdown"), "reason: {reason}");
    }

    #[test]
    fn test_position_halt() {
        let mut limits = limits();
        limits.max_position_usd = dec!(100);
        let mut ledger = PnlLedger::new(limits, day("2026-08-01"));
        let out = ledger.apply_fill(Side::Bid, dec!(50), dec!(2), day("2026-08-01"));
        assert!(out.halted);
        assert!(matches!(
            ledger.halt_reason(),
            Some(HaltReason::MaxPosition { .. })
        ));
    }

    #[test]
    fn test_daily_loss_halt_and_rollover_clear() {
        // Daily-loss halts clear at UTC rollover, others do not.
        let mut limits = limits();
        limits.daily_loss_limit_usd = dec!(1);
        let mut ledger = PnlLedger::new(limits, day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        let out = ledger.apply_fill(Side::Ask, dec!(98), dec!(1), day("2026-08-01"));
        assert!(out.halted);
        assert_eq!(ledger.get_state(dec!(98), day("2026-08-01")).daily_pnl, dec!(-2));

        // Still halted later the same day.
        assert!(ledger.is_halted());

        let state = ledger.get_state(dec!(98), day("2026-08-02"));
        assert!(!state.halted);
        assert_eq!(state.daily_pnl, Decimal::ZERO);
        assert_eq!(state.daily_start_date, day("2026-08-02"));
        // Cumulative realized survives the rollover.
        assert_eq!(state.realized_pnl, dec!(-2));
    }

    #[test]
    fn test_non_daily_halt_survives_rollover() {
        let mut limits = limits();
        limits.max_drawdown_usd = dec!(1);
        let mut ledger = PnlLedger::new(limits, day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        ledger.get_state(dec!(103), day("2026-08-01"));
        ledger.get_state(dec!(100), day("2026-08-01"));
        assert!(ledger.is_halted());
        let state = ledger.get_state(dec!(100), day("2026-08-02"));
        assert!(state.halted, "drawdown halt must survive rollover");
        ledger.reset_halt();
        assert!(!ledger.is_halted());
    }

    #[test]
    fn test_halt_reason_sticky() {
        let mut limits = limits();
        limits.max_drawdown_usd = dec!(1);
        limits.max_position_usd = dec!(10);
        let mut ledger = PnlLedger::new(limits, day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        ledger.get_state(dec!(103), day("2026-08-01"));
        ledger.get_state(dec!(100), day("2026-08-01"));
        let first = ledger.halt_reason().cloned();
        assert!(matches!(first, Some(HaltReason::MaxDrawdown { .. })));
        // Position breach while halted does not replace the reason.
        ledger.get_state(dec!(50), day("2026-08-01"));
        assert_eq!(ledger.halt_reason().cloned(), first);
    }

    #[test]
    fn test_sync_position_keeps_entry() {
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.apply_fill(Side::Bid, dec!(100), dec!(1), day("2026-08-01"));
        ledger.sync_position(dec!(1.5), dec!(110));
        assert_eq!(ledger.position_base(), dec!(1.5));
        // Existing entry survives; only the size changed.
        assert_eq!(ledger.avg_entry_price(), dec!(100));
        // From flat, the fallback mark prices the adopted position.
        let mut flat = PnlLedger::new(limits(), day("2026-08-01"));
        flat.sync_position(dec!(2), dec!(50));
        assert_eq!(flat.avg_entry_price(), dec!(50));
        assert_eq!(flat.unrealized_pnl(dec!(50)), Decimal::ZERO);
    }

    #[test]
    fn test_seed_zeroes_initial_unrealized() {
        let mut ledger = PnlLedger::new(limits(), day("2026-08-01"));
        ledger.seed(dec!(2), dec!(100));
        assert!(ledger.is_seeded());
        assert_eq!(ledger.unrealized_pnl(dec!(100)), Decimal::ZERO);
        assert_eq!(ledger.avg_entry_price(), dec!(100));
        // Second seed is a no-op.
        ledger.seed(dec!(5), dec!(50));
        assert_eq!(ledger.position_base(), dec!(2));
    }
}
