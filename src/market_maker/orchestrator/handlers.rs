//! Event handlers and the per-tick quote procedure.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::errors::VenueErrorKind;
use crate::helpers::bps_diff;
use crate::prelude::Error;
use crate::venue::{FillEvent, PriceEvent, Side, TradeLogger, VenueRpc};

use super::super::quoting::{Quote, QuoteInputs};
use super::super::records::{FillRecord, QuoteMode, SnapshotRecord};
use super::{MarketMaker, MARGIN_WARN_THRESHOLD, PAIRING_WINDOW_MS};

impl<V: VenueRpc, L: TradeLogger> MarketMaker<V, L> {
    /// Reference-exchange price update: feeds the fair estimator and
    /// drives the throttled quote tick.
    pub(super) async fn on_reference_price(&mut self, price: PriceEvent) {
        self.now_ms = self.now_ms.max(price.timestamp_ms);
        if self.warmup_start_ms.is_none() {
            self.warmup_start_ms = Some(price.timestamp_ms);
            info!(
                target: "basis_maker::core",
                warmup_seconds = self.config.warmup_seconds,
                "first reference sample, warmup started"
            );
        }
        self.last_reference = Some(price);
        self.try_pair_offset();

        if self.throttle.on_event(std::time::Instant::now()) {
            self.quote_tick().await;
        }
    }

    /// Venue book update: feeds volatility/momentum and the basis pairing.
    pub(super) fn on_venue_book(&mut self, price: PriceEvent) {
        self.now_ms = self.now_ms.max(price.timestamp_ms);
        self.volatility.add_sample(price.timestamp_ms, price.mid);
        self.momentum.add_sample(price.timestamp_ms, price.mid);
        self.last_venue_book = Some(price);
        self.try_pair_offset();
    }

    /// Record a basis sample when the two feeds' latest samples are close
    /// enough in time to pair.
    fn try_pair_offset(&mut self) {
        let (Some(reference), Some(venue)) = (&self.last_reference, &self.last_venue_book) else {
            return;
        };
        let age_gap = reference.timestamp_ms.abs_diff(venue.timestamp_ms);
        if age_gap <= PAIRING_WINDOW_MS {
            let sample_ms = reference.timestamp_ms.max(venue.timestamp_ms);
            self.fair.add_sample(sample_ms, venue.mid, reference.mid);
        }
    }

    /// The per-tick quote procedure.
    pub(super) async fn quote_tick(&mut self) {
        // Overlapping invocations are dropped; the trailing throttle edge
        // reissues the tick.
        if self.is_updating {
            return;
        }
        let Some(reference) = self.last_reference else {
            return;
        };
        let Some(fair) = self.fair.fair_price(self.now_ms, reference.mid) else {
            debug!(
                target: "basis_maker::estimator",
                samples = self.fair.valid_samples(self.now_ms),
                needed = self.config.fair_min_samples,
                "fair price not ready"
            );
            return;
        };

        // First usable fair: seed the PnL ledger with whatever position
        // the venue reported at startup so unrealized starts near zero.
        if !self.pnl.is_seeded() {
            self.pnl.seed(self.position.base_size(), fair);
        }

        if self.pnl.is_halted() {
            // A halt tripped by mark-to-market (status or snapshot path)
            // may not have cancelled yet; quoting stays suspended either way.
            if !self.orders.is_empty() {
                self.cancel_all_orders().await;
            }
            return;
        }
        if !self.is_warm() {
            debug!(
                target: "basis_maker::core",
                elapsed_ms = self.now_ms.saturating_sub(self.warmup_start_ms.unwrap_or(self.now_ms)),
                "warming up"
            );
            return;
        }

        let ctx = self.position.quoting_context(fair);
        let inputs = QuoteInputs {
            fair,
            position_usd: ctx.base_size * fair,
            volatility_bps: self.volatility.volatility_bps(self.now_ms),
            momentum_bps: self.momentum.momentum_bps(),
            bbo: self.current_bbo(),
            allowed_sides: ctx.allowed_sides,
        };
        let set = self.quoter.quotes(&inputs);
        self.last_spread_bps = set.diagnostics.spread_bps;

        let quotes = self.degrade_for_margin(set.quotes, ctx.base_size);
        if quotes.is_empty() {
            return;
        }

        // Reprice suppression: skip the venue round-trip when the skewed
        // mid has barely moved and the ladder shape is unchanged.
        if let (Some(threshold), Some(last_mid)) =
            (self.config.reprice_threshold_bps, self.last_quoted_mid)
        {
            let drift = bps_diff(last_mid, set.diagnostics.skewed_mid);
            if drift < threshold && quotes.len() == self.orders.len() {
                debug!(
                    target: "basis_maker::quoting",
                    drift_bps = %format!("{drift:.2}"),
                    threshold_bps = threshold,
                    "reprice skipped, mid drift below threshold"
                );
                return;
            }
        }

        self.is_updating = true;
        let current: Vec<_> = self.orders.orders().to_vec();
        let result = self
            .reconciler
            .reconcile(&*self.venue, &current, &quotes)
            .await;
        self.is_updating = false;

        match result {
            Ok(outcome) => {
                if outcome.needs_sync || outcome.had_chunk_errors {
                    self.force_order_sync = true;
                }
                self.orders.replace(outcome.orders);
                self.margin_rejections = 0;
                self.last_quoted_mid = Some(set.diagnostics.skewed_mid);
                debug!(
                    target: "basis_maker::quoting",
                    resting = self.orders.len(),
                    skewed_mid = %set.diagnostics.skewed_mid,
                    "QUOTE tick complete"
                );
            }
            Err(err) => self.handle_reconcile_error(err),
        }
    }

    /// Classify a rethrown reconcile failure.
    fn handle_reconcile_error(&mut self, err: Error) {
        match err.venue_kind() {
            Some(VenueErrorKind::Margin) => {
                // Cache stays: the venue rejected new orders, it did not
                // cancel resting ones.
                self.margin_rejections += 1;
                if self.margin_rejections >= MARGIN_WARN_THRESHOLD {
                    warn!(
                        target: "basis_maker::risk",
                        consecutive = self.margin_rejections,
                        "margin rejections persisting, operator attention required"
                    );
                } else {
                    warn!(
                        target: "basis_maker::execution",
                        consecutive = self.margin_rejections,
                        %err,
                        "margin rejection, degrading quote set"
                    );
                }
            }
            Some(VenueErrorKind::PostOnlyReject) => {
                warn!(target: "basis_maker::execution", %err, "post-only cross, will reprice");
            }
            Some(VenueErrorKind::OrderNotFound) => {
                warn!(target: "basis_maker::execution", %err, "stale order id, forcing sync");
                self.force_order_sync = true;
            }
            _ => {
                warn!(target: "basis_maker::execution", %err, "reconcile failed, forcing sync");
                self.force_order_sync = true;
            }
        }
    }

    /// Degenerate-state quoting while margin is rejecting orders.
    ///
    /// One rejection drops the ladder to its best bid and ask; repeated
    /// rejections drop to a single reducing-side quote (alternating sides
    /// when flat) until the venue accepts again.
    pub(super) fn degrade_for_margin(
        &mut self,
        quotes: Vec<Quote>,
        base_size: Decimal,
    ) -> Vec<Quote> {
        if self.margin_rejections == 0 || quotes.is_empty() {
            return quotes;
        }

        let best_bid = quotes
            .iter()
            .filter(|q| q.side == Side::Bid)
            .max_by_key(|q| q.price)
            .cloned();
        let best_ask = quotes
            .iter()
            .filter(|q| q.side == Side::Ask)
            .min_by_key(|q| q.price)
            .cloned();

        if self.margin_rejections == 1 {
            return best_bid.into_iter().chain(best_ask).collect();
        }

        // Two or more: a single quote, on the reducing side if we hold a
        // position, otherwise alternating sides to keep probing.
        let side = if base_size.is_zero() {
            let side = self.flat_fallback_side;
            self.flat_fallback_side = side.opposite();
            side
        } else {
            Side::reducing(base_size > Decimal::ZERO)
        };
        match side {
            Side::Bid => best_bid.into_iter().collect(),
            Side::Ask => best_ask.into_iter().collect(),
        }
    }

    /// Apply a fill from the venue account stream.
    pub(super) async fn on_fill(&mut self, fill: FillEvent) {
        if fill.market_id != self.config.market_id {
            return;
        }

        // Optimistic position update first; the authoritative sync that
        // follows corrects any divergence.
        self.position.apply_fill(fill.side, fill.size);

        // The fill consumed (part of) a resting order whose id may now be
        // stale; refresh the cache before the next reconcile.
        self.force_order_sync = true;

        let today = Utc::now().date_naive();
        let fair = self.current_fair().unwrap_or(fill.price);
        let outcome = self.pnl.apply_fill(fill.side, fill.price, fill.size, today);
        let state = self.pnl.get_state(fair, today);

        let close_mode = self.position.is_close_mode(fair);
        let record = FillRecord {
            timestamp: Utc::now(),
            epoch: self.now_ms,
            symbol: self.config.market_id.to_string(),
            side: fill.side.to_string(),
            price: fill.price,
            size: fill.size,
            size_usd: fill.size * fill.price,
            position_after: state.position_base,
            position_usd_after: state.position_base * fair,
            realized_pnl: outcome.realized,
            cumulative_realized_pnl: state.realized_pnl,
            unrealized_pnl: state.unrealized_pnl,
            fair_price: fair,
            mode: if close_mode {
                QuoteMode::Close
            } else {
                QuoteMode::Normal
            },
            spread_bps: self.last_spread_bps,
        };
        self.logger.log_fill(&record);

        info!(
            target: "basis_maker::tracking",
            side = %fill.side,
            price = %fill.price,
            size = %fill.size,
            position = %state.position_base,
            realized = %outcome.realized,
            total_pnl = %state.total_pnl,
            "FILL"
        );

        if state.halted {
            warn!(
                target: "basis_maker::risk",
                reason = %state.halt_reason.as_ref().map(ToString::to_string).unwrap_or_default(),
                "halted after fill, cancelling all orders"
            );
            self.cancel_all_orders().await;
        } else if close_mode && !self.was_close_mode {
            info!(
                target: "basis_maker::tracking",
                position_usd = %(state.position_base * fair),
                "entering close mode, cancelling to requote reducing side"
            );
            self.cancel_all_orders().await;
        }
        self.was_close_mode = close_mode;
    }

    /// Periodic STATUS line.
    pub(super) fn log_status(&mut self) {
        let Some(reference) = self.last_reference else {
            info!(target: "basis_maker::core", "STATUS waiting for reference feed");
            return;
        };
        let fair = self.fair.fair_price(self.now_ms, reference.mid);
        let offset = self.fair.raw_median_offset(self.now_ms);
        let vol = self.volatility.volatility_bps(self.now_ms);
        let state = fair.map(|f| self.pnl.get_state(f, Utc::now().date_naive()));
        let (bids, asks) = super::super::reconcile::count_by_side(self.orders.orders());

        info!(
            target: "basis_maker::core",
            fair = %fair.map(|f| f.to_string()).unwrap_or_else(|| "warming".into()),
            median_offset = %offset.map(|o| o.to_string()).unwrap_or_else(|| "-".into()),
            vol_bps = %vol.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
            momentum_bps = %format!("{:.2}", self.momentum.momentum_bps()),
            position = %self.position.base_size(),
            bids,
            asks,
            total_pnl = %state
                .as_ref()
                .map(|s| s.total_pnl.to_string())
                .unwrap_or_else(|| "-".into()),
            drawdown = %state
                .as_ref()
                .map(|s| s.drawdown.to_string())
                .unwrap_or_else(|| "-".into()),
            halted = self.pnl.is_halted(),
            "STATUS"
        );
    }

    /// Periodic PnL snapshot for the trade logger.
    pub(super) fn emit_snapshot(&mut self) {
        let mark = self
            .current_fair()
            .or_else(|| self.last_venue_book.as_ref().map(|b| b.mid));
        let Some(mark) = mark else {
            return;
        };
        let state = self.pnl.get_state(mark, Utc::now().date_naive());
        let record = SnapshotRecord {
            timestamp: Utc::now(),
            epoch: self.now_ms,
            symbol: self.config.market_id.to_string(),
            position_base: state.position_base,
            position_usd: state.position_base * mark,
            avg_entry_price: state.avg_entry_price,
            realized_pnl: state.realized_pnl,
            unrealized_pnl: state.unrealized_pnl,
            total_pnl: state.total_pnl,
            daily_pnl: state.daily_pnl,
            peak_pnl: state.peak_pnl,
            drawdown: state.drawdown,
            win_count: state.win_count,
            loss_count: state.loss_count,
            trade_count: state.trade_count,
            volume_usd: state.volume_usd,
            halted: state.halted,
            halt_reason: state.halt_reason.map(|r| r.to_string()),
        };
        self.logger.log_snapshot(&record);
    }
}
