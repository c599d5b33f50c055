//! Records produced for the external trade logger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quoting mode at the time of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    Normal,
    Close,
}

/// One executed fill, enriched with ledger state after application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds since the Unix epoch, for cheap downstream sorting.
    pub epoch: u64,
    pub symbol: String,
    pub side: String,
    pub price: Decimal,
    pub size: Decimal,
    pub size_usd: Decimal,
    pub position_after: Decimal,
    pub position_usd_after: Decimal,
    pub realized_pnl: Decimal,
    pub cumulative_realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub fair_price: Decimal,
    pub mode: QuoteMode,
    pub spread_bps: f64,
}

/// Periodic ledger snapshot (every 60 s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub epoch: u64,
    pub symbol: String,
    pub position_base: Decimal,
    pub position_usd: Decimal,
    pub avg_entry_price: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub peak_pnl: Decimal,
    pub drawdown: Decimal,
    pub win_count: u64,
    pub loss_count: u64,
    pub trade_count: u64,
    pub volume_usd: Decimal,
    pub halted: bool,
    pub halt_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fill_record_round_trips_json() {
        let record = FillRecord {
            timestamp: Utc::now(),
            epoch: 1_700_000_000_000,
            symbol: "ETH-PERP".into(),
            side: "bid".into(),
            price: dec!(100.05),
            size: dec!(0.1),
            size_usd: dec!(10.005),
            position_after: dec!(0.1),
            position_usd_after: dec!(10.005),
            realized_pnl: Decimal::ZERO,
            cumulative_realized_pnl: dec!(1.25),
            unrealized_pnl: dec!(-0.02),
            fair_price: dec!(100.04),
            mode: QuoteMode::Normal,
            spread_bps: 12.5,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"mode\":\"normal\""));
        let back: FillRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.price, record.price);
        assert_eq!(back.mode, record.mode);
    }
}
