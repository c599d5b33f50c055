//! Authoritative state refresh from the venue.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::prelude::{Error, Result};
use crate::venue::{TradeLogger, VenueInfo, VenueRpc};

use super::MarketMaker;

/// First retry delay; doubles per attempt.
const SYNC_RETRY_BASE: Duration = Duration::from_millis(500);

/// Attempts per sync before giving up until the next interval.
const SYNC_MAX_ATTEMPTS: u32 = 3;

impl<V: VenueRpc, L: TradeLogger> MarketMaker<V, L> {
    /// Fetch venue info with bounded exponential-backoff retry.
    pub(super) async fn fetch_info_with_retry(&self) -> Result<VenueInfo> {
        let mut delay = SYNC_RETRY_BASE;
        let mut last_error = String::new();
        for attempt in 1..=SYNC_MAX_ATTEMPTS {
            match self.venue.fetch_info().await {
                Ok(info) => return Ok(info),
                Err(err) => {
                    warn!(
                        target: "basis_maker::core",
                        attempt,
                        %err,
                        "venue info fetch failed"
                    );
                    last_error = err.to_string();
                }
            }
            if attempt < SYNC_MAX_ATTEMPTS {
                sleep(delay).await;
                delay *= 2;
            }
        }
        Err(Error::SyncExhausted {
            attempts: SYNC_MAX_ATTEMPTS,
            last_error,
        })
    }

    /// Replace the order cache with the venue's open-order list.
    ///
    /// On failure the prior cache is retained; the diff stays idempotent
    /// against a stale view and the next interval retries.
    pub(super) async fn sync_orders(&mut self) {
        match self.fetch_info_with_retry().await {
            Ok(info) => {
                self.orders
                    .sync_from_venue(&self.config.market_id, &info.open_orders);
                debug!(
                    target: "basis_maker::execution",
                    resting = self.orders.len(),
                    "order cache synced from venue"
                );
            }
            Err(err) => {
                warn!(target: "basis_maker::execution", %err, "order sync failed, keeping cache");
            }
        }
    }

    /// Adopt the venue's authoritative position into both ledgers.
    pub(super) async fn sync_position(&mut self) {
        match self.fetch_info_with_retry().await {
            Ok(info) => {
                if self.position.sync_from_server(info.position) {
                    // Mirror the correction into the PnL ledger so its
                    // notional checks track reality; entry falls back to
                    // the current mark for a position appearing from flat.
                    let mark = self
                        .current_fair()
                        .or_else(|| self.last_venue_book.as_ref().map(|b| b.mid));
                    if let Some(mark) = mark {
                        self.pnl.sync_position(info.position, mark);
                    }
                }
            }
            Err(err) => {
                warn!(target: "basis_maker::tracking", %err, "position sync failed, keeping local");
            }
        }
    }
}
