//! Realized volatility of the venue mid.
//!
//! Samples the mid once per integer second and computes the
//! Bessel-corrected standard deviation of basis-point returns over the
//! configured window. No annualization; the quoter consumes raw bps.

use rust_decimal::Decimal;

use crate::helpers::f64_from_dec;

use super::ring::Ring;

/// Return samples retained.
const RETURN_CAPACITY: usize = 300;

#[derive(Debug, Clone, Copy)]
struct ReturnSample {
    second: u64,
    mid: Decimal,
}

/// Rolling standard deviation of one-second bps returns.
#[derive(Debug)]
pub struct VolatilityTracker {
    samples: Ring<ReturnSample>,
    window_seconds: u64,
    min_samples: usize,
}

impl VolatilityTracker {
    pub fn new(window_seconds: u64, min_samples: usize) -> Self {
        Self {
            samples: Ring::new(RETURN_CAPACITY),
            window_seconds,
            min_samples,
        }
    }

    /// Record the venue mid; at most one sample per integer second sticks.
    pub fn add_sample(&mut self, now_ms: u64, mid: Decimal) {
        let second = now_ms / 1000;
        if let Some(last) = self.samples.last() {
            if second <= last.second {
                return;
            }
        }
        self.samples.push(ReturnSample { second, mid });
    }

    /// Sample stddev of bps returns over the window, or `None` until
    /// `min_samples` returns exist.
    pub fn volatility_bps(&self, now_ms: u64) -> Option<f64> {
        let returns = self.window_returns(now_ms);
        if returns.len() < self.min_samples {
            return None;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    }

    /// Number of in-window returns.
    pub fn sample_count(&self, now_ms: u64) -> usize {
        self.window_returns(now_ms).len()
    }

    fn window_returns(&self, now_ms: u64) -> Vec<f64> {
        let now_second = now_ms / 1000;
        let oldest = now_second.saturating_sub(self.window_seconds);
        let mut returns = Vec::new();
        let mut prev: Option<ReturnSample> = None;
        for sample in self.samples.iter() {
            if let Some(p) = prev {
                if sample.second > oldest && p.mid > Decimal::ZERO {
                    let r = f64_from_dec((sample.mid - p.mid) / p.mid) * 10_000.0;
                    returns.push(r);
                }
            }
            prev = Some(*sample);
        }
        returns
    }
}
