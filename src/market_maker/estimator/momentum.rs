//! Directional momentum of the venue mid.
//!
//! EMA of signed one-second bps returns. Strong momentum flags the
//! adversely-selected side so the quoter can widen it.

use rust_decimal::Decimal;

use crate::helpers::f64_from_dec;

/// EMA momentum tracker over once-per-second returns.
#[derive(Debug)]
pub struct MomentumTracker {
    alpha: f64,
    strong_threshold_bps: f64,
    last_second: u64,
    last_mid: Option<Decimal>,
    ema_bps: Option<f64>,
}

impl MomentumTracker {
    /// `period_seconds` sets the EMA half-life via `α = 2/(period+1)`.
    pub fn new(period_seconds: u64, strong_threshold_bps: f64) -> Self {
        Self {
            alpha: 2.0 / (period_seconds as f64 + 1.0),
            strong_threshold_bps,
            last_second: 0,
            last_mid: None,
            ema_bps: None,
        }
    }

    /// Record the venue mid; at most one sample per integer second sticks.
    ///
    /// The first sample only seeds the previous mid; the EMA starts with
    /// the second sample's return.
    pub fn add_sample(&mut self, now_ms: u64, mid: Decimal) {
        let second = now_ms / 1000;
        if self.last_mid.is_some() && second <= self.last_second {
            return;
        }
        if let Some(prev) = self.last_mid {
            if prev > Decimal::ZERO {
                let ret_bps = f64_from_dec((mid - prev) / prev) * 10_000.0;
                self.ema_bps = Some(match self.ema_bps {
                    Some(ema) => self.alpha * ret_bps + (1.0 - self.alpha) * ema,
                    None => ret_bps,
                });
            }
        }
        self.last_second = second;
        self.last_mid = Some(mid);
    }

    /// Signed EMA momentum in bps; 0 until two samples exist.
    pub fn momentum_bps(&self) -> f64 {
        self.ema_bps.unwrap_or(0.0)
    }

    /// Whether |momentum| exceeds the strong threshold.
    pub fn is_strong(&self) -> bool {
        self.momentum_bps().abs() > self.strong_threshold_bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_sample_seeds_only() {
        let mut m = MomentumTracker::new(30, 5.0);
        m.add_sample(1_000, dec!(100));
        assert_eq!(m.momentum_bps(), 0.0);
        assert!(!m.is_strong());
    }

    #[test]
    fn test_second_sample_starts_ema() {
        let mut m = MomentumTracker::new(30, 5.0);
        m.add_sample(1_000, dec!(100));
        m.add_sample(2_000, dec!(100.1));
        // +10 bps return seeds the EMA directly.
        assert!((m.momentum_bps() - 10.0).abs() < 0.05);
    }

    #[test]
    fn test_ema_update() {
        let mut m = MomentumTracker::new(9, 5.0); // alpha = 0.2
        m.add_sample(1_000, dec!(100));
        m.add_sample(2_000, dec!(100.1)); // EMA ≈ +10 bps
        m.add_sample(3_000, dec!(100.1)); // 0 bps return
        let expected = 0.2 * 0.0 + 0.8 * 9.99;
        assert!((m.momentum_bps() - expected).abs() < 0.1);
    }

    #[test]
    fn test_strong_threshold() {
        let mut m = MomentumTracker::new(1, 5.0); // alpha = 1: EMA tracks last return
        m.add_sample(1_000, dec!(100));
        m.add_sample(2_000, dec!(100.1));
        assert!(m.is_strong());
        m.add_sample(3_000, dec!(100.1));
        assert!(!m.is_strong());
    }

    #[test]
    fn test_negative_momentum_sign() {
        let mut m = MomentumTracker::new(1, 5.0);
        m.add_sample(1_000, dec!(100));
        m.add_sample(2_000, dec!(99.9));
        assert!(m.momentum_bps() < -9.0);
    }

    #[test]
    fn test_second_dedup() {
        let mut m = MomentumTracker::new(30, 5.0);
        m.add_sample(1_000, dec!(100));
        m.add_sample(1_500, dec!(200));
        assert_eq!(m.momentum_bps(), 0.0);
    }
}
