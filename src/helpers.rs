//! Decimal rounding and basis-point helpers shared across the engine.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Absolute difference between two prices in basis points of the first.
///
/// Returns 0 when the reference price is non-positive.
pub fn bps_diff(a: Decimal, b: Decimal) -> f64 {
    if a <= Decimal::ZERO {
        return 0.0;
    }
    let ratio = ((a - b) / a).abs();
    ratio.to_f64().unwrap_or(0.0) * 10_000.0
}

/// Align a price down to the venue tick grid.
pub fn floor_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return price;
    }
    (price / tick).floor() * tick
}

/// Align a price up to the venue tick grid.
pub fn ceil_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return price;
    }
    (price / tick).ceil() * tick
}

/// Align a size down to the venue lot grid.
pub fn floor_to_lot(size: Decimal, lot: Decimal) -> Decimal {
    if lot <= Decimal::ZERO {
        return size;
    }
    (size / lot).floor() * lot
}

/// Convert an f64 ratio (vol, skew, multiplier) into a `Decimal` factor.
///
/// Rounds away binary-float noise (0.6f64 becomes exactly 0.6); non-finite
/// inputs collapse to zero rather than poisoning price math.
pub(crate) fn dec_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Lossy `Decimal` to f64, for ratio computations only.
pub(crate) fn f64_from_dec(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
