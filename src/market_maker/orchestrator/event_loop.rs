//! Startup synchronization, the select loop, and shutdown.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, sleep_until, Instant as TokioInstant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::prelude::Result;
use crate::venue::{EngineEvent, TradeLogger, VenueRpc};

use super::MarketMaker;
use super::SNAPSHOT_INTERVAL;

impl<V: VenueRpc, L: TradeLogger> MarketMaker<V, L> {
    /// Run the engine until shutdown.
    ///
    /// Consumes events from `events` (fed by the feed/stream collaborators)
    /// and drives the periodic sync, status, and snapshot tasks. All state
    /// lives on this task.
    pub async fn run(mut self, mut events: UnboundedReceiver<EngineEvent>) -> Result<()> {
        self.config.log_banner();
        self.startup_sync().await;

        let mut order_sync = interval(Duration::from_millis(self.config.order_sync_interval_ms));
        let mut position_sync =
            interval(Duration::from_millis(self.config.position_sync_interval_ms));
        let mut status = interval(Duration::from_millis(self.config.status_interval_ms));
        let mut snapshot = interval(SNAPSHOT_INTERVAL);
        for ticker in [&mut order_sync, &mut position_sync, &mut status, &mut snapshot] {
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; startup just
            // synced, so push each first fire out a full period.
            ticker.reset();
        }

        loop {
            let trailing = self
                .throttle
                .trailing_deadline()
                .map(TokioInstant::from_std);

            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(EngineEvent::ReferencePrice(price)) => {
                            self.on_reference_price(price).await;
                        }
                        Some(EngineEvent::VenueBook(price)) => {
                            self.on_venue_book(price);
                        }
                        Some(EngineEvent::Fill(fill)) => {
                            self.on_fill(fill).await;
                        }
                        Some(EngineEvent::ResetHalt) => {
                            self.pnl.reset_halt();
                        }
                        Some(EngineEvent::Shutdown) | None => {
                            break;
                        }
                    }
                }
                _ = async { sleep_until(trailing.unwrap()).await }, if trailing.is_some() => {
                    if self.throttle.fire_trailing(std::time::Instant::now()) {
                        self.quote_tick().await;
                    }
                }
                _ = order_sync.tick() => {
                    self.sync_orders().await;
                }
                _ = position_sync.tick() => {
                    self.sync_position().await;
                }
                _ = status.tick() => {
                    self.log_status();
                }
                _ = snapshot.tick() => {
                    self.emit_snapshot();
                }
            }

            // A fill or reconcile failure may have requested an immediate
            // authoritative refresh; run it outside the handlers so it
            // cannot recurse into them.
            if self.force_order_sync {
                self.force_order_sync = false;
                self.sync_orders().await;
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Adopt the venue's view before the first quote cycle.
    ///
    /// Orders left resting by a previous session would fill untracked, so
    /// they are cancelled outright; the position is taken as-is.
    pub(super) async fn startup_sync(&mut self) {
        match self.fetch_info_with_retry().await {
            Ok(info) => {
                self.position.sync_from_server(info.position);
                self.orders
                    .sync_from_venue(&self.config.market_id, &info.open_orders);
                if !self.orders.is_empty() {
                    warn!(
                        target: "basis_maker::core",
                        resting = self.orders.len(),
                        "cancelling orders left over from a previous session"
                    );
                    self.cancel_all_orders().await;
                }
                info!(
                    target: "basis_maker::core",
                    position = %self.position.base_size(),
                    "startup sync complete"
                );
            }
            Err(err) => {
                // Start flat; the periodic syncs adopt the venue's view as
                // soon as it becomes reachable.
                error!(
                    target: "basis_maker::core",
                    %err,
                    "startup sync failed, continuing with empty state"
                );
            }
        }
    }

    /// Cancel every cached order. Used on halt, close-mode entry, and
    /// shutdown. Recovered chunk errors leave the survivors cached.
    pub(super) async fn cancel_all_orders(&mut self) {
        if self.orders.is_empty() {
            return;
        }
        let current: Vec<_> = self.orders.orders().to_vec();
        match self.reconciler.reconcile(&*self.venue, &current, &[]).await {
            Ok(outcome) => {
                if outcome.needs_sync {
                    self.force_order_sync = true;
                }
                if outcome.had_chunk_errors {
                    warn!(
                        target: "basis_maker::execution",
                        remaining = outcome.orders.len(),
                        "cancel-all left orders behind, sync will reconcile"
                    );
                }
                self.orders.replace(outcome.orders);
            }
            Err(err) => {
                warn!(target: "basis_maker::execution", %err, "cancel-all failed");
                self.force_order_sync = true;
            }
        }
    }

    /// Graceful shutdown: disarm the throttle, cancel resting orders, and
    /// emit a final snapshot.
    async fn shutdown(&mut self) {
        info!(target: "basis_maker::core", "shutting down");
        self.throttle.cancel();
        self.cancel_all_orders().await;
        self.emit_snapshot();
        info!(target: "basis_maker::core", "shutdown complete");
    }
}
