//! Price-derived signal estimators.
//!
//! - `FairPriceEstimator`: reference mid + median venue basis
//! - `VolatilityTracker`: rolling stddev of one-second bps returns
//! - `MomentumTracker`: EMA of signed one-second bps returns

mod fair_price;
mod momentum;
mod ring;
mod volatility;

pub use fair_price::FairPriceEstimator;
pub use momentum::MomentumTracker;
pub use volatility::VolatilityTracker;
