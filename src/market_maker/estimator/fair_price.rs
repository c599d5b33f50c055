//! Fair price from the reference mid plus the median venue basis.
//!
//! The venue book is thin and noisy; the reference exchange leads price but
//! trades at a structural basis to the venue. Fusing the two as
//! `reference + median(venue − reference)` gives a drift-corrected mid that
//! is robust to outliers in either feed.

use rust_decimal::Decimal;

use super::ring::Ring;

/// Slot width for offset deduplication (ms).
const SLOT_MS: u64 = 200;

/// Offset samples retained (≈8.3 minutes at one per slot).
const OFFSET_CAPACITY: usize = 2500;

/// One venue-minus-reference basis observation.
#[derive(Debug, Clone, Copy)]
struct OffsetSample {
    slot: u64,
    offset: Decimal,
}

/// Median-offset fair price estimator.
#[derive(Debug)]
pub struct FairPriceEstimator {
    offsets: Ring<OffsetSample>,
    last_slot: u64,
    window_slots: u64,
    min_samples: usize,
}

impl FairPriceEstimator {
    /// `window_ms` is the lookback for valid samples; `min_samples` gates
    /// the estimate until enough basis observations exist.
    pub fn new(window_ms: u64, min_samples: usize) -> Self {
        Self {
            offsets: Ring::new(OFFSET_CAPACITY),
            last_slot: 0,
            window_slots: window_ms / SLOT_MS,
            min_samples,
        }
    }

    /// Record a paired observation of both feeds.
    ///
    /// At most one sample is stored per 200 ms slot; later calls within the
    /// same slot are dropped without touching the buffer.
    pub fn add_sample(&mut self, now_ms: u64, venue_mid: Decimal, reference_mid: Decimal) {
        let slot = now_ms / SLOT_MS;
        if slot <= self.last_slot {
            return;
        }
        self.last_slot = slot;
        self.offsets.push(OffsetSample {
            slot,
            offset: venue_mid - reference_mid,
        });
    }

    /// Fair price at `now_ms`, or `None` until the window holds
    /// `min_samples` fresh observations.
    pub fn fair_price(&self, now_ms: u64, reference_mid: Decimal) -> Option<Decimal> {
        let valid = self.valid_offsets(now_ms);
        if valid.len() < self.min_samples {
            return None;
        }
        median(valid).map(|m| reference_mid + m)
    }

    /// Median basis regardless of the `min_samples` gate (status display).
    pub fn raw_median_offset(&self, now_ms: u64) -> Option<Decimal> {
        median(self.valid_offsets(now_ms))
    }

    /// Number of in-window samples.
    pub fn valid_samples(&self, now_ms: u64) -> usize {
        self.valid_offsets(now_ms).len()
    }

    fn valid_offsets(&self, now_ms: u64) -> Vec<Decimal> {
        let now_slot = now_ms / SLOT_MS;
        let oldest = now_slot.saturating_sub(self.window_slots);
        self.offsets
            .iter()
            .filter(|s| s.slot > oldest)
            .map(|s| s.offset)
            .collect()
    }
}

/// Median of a set of offsets; even counts average the two middle values.
fn median(mut values: Vec<Decimal>) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let n = values.len();
    let mid = n / 2;
    if n % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / Decimal::TWO)
    }
}
