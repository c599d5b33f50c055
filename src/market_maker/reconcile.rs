//! Order reconciliation against the venue.
//!
//! Diffs the desired quote set against the cached resting orders and
//! executes the minimal cancel+place batch, chunked to the venue's
//! atomic-group limit. Chunks are independent: a recoverable failure skips
//! that chunk and the diff re-converges on the next tick, which is what
//! makes resubmission of the same desired set a no-op.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::errors::VenueErrorKind;
use crate::prelude::Result;
use crate::venue::{ActionResult, FillMode, Side, VenueAction, VenueRpc};

use super::quoting::Quote;
use super::tracking::CachedOrder;

/// Venue atomic-group limit.
const MAX_ACTIONS_PER_CHUNK: usize = 4;

/// One planned venue action with enough context to apply its result.
#[derive(Debug, Clone)]
enum PlannedAction {
    /// Cancel a resting order; on skip the order stays cached.
    Cancel(CachedOrder),
    /// Place a desired quote; on success the returned id joins the cache.
    Place(Quote),
}

impl PlannedAction {
    fn to_venue_action(&self, market_id: &Arc<str>) -> VenueAction {
        match self {
            PlannedAction::Cancel(order) => VenueAction::Cancel {
                order_id: order.order_id,
            },
            PlannedAction::Place(quote) => VenueAction::Place {
                market_id: Arc::clone(market_id),
                side: quote.side,
                price: quote.price,
                size: quote.size,
                fill_mode: FillMode::PostOnly,
                reduce_only: false,
            },
        }
    }
}

/// Plan produced by the pure diff step.
#[derive(Debug)]
pub struct ReconcilePlan {
    /// Resting orders that already match a desired quote.
    kept: Vec<CachedOrder>,
    /// Cancels first, then places.
    actions: Vec<PlannedAction>,
}

impl ReconcilePlan {
    /// Number of venue actions this plan will issue.
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

/// Result of executing a reconcile pass.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The new cached order set.
    pub orders: Vec<CachedOrder>,
    /// At least one chunk failed recoverably.
    pub had_chunk_errors: bool,
    /// A stale cancel was observed; the caller should force an order sync.
    pub needs_sync: bool,
}

/// Diff-based order reconciler for a single market.
#[derive(Debug)]
pub struct OrderReconciler {
    market_id: Arc<str>,
}

impl OrderReconciler {
    pub fn new(market_id: Arc<str>) -> Self {
        Self { market_id }
    }

    pub fn market_id(&self) -> &Arc<str> {
        &self.market_id
    }

    /// Compute the minimal action plan.
    ///
    /// An existing order matches a desired quote iff side, price, and size
    /// are decimal-equal; each order consumes at most one quote. Matched
    /// orders are kept, unmatched orders cancelled, unmatched quotes placed.
    pub fn plan(&self, current: &[CachedOrder], desired: &[Quote]) -> ReconcilePlan {
        let mut unmatched: Vec<&Quote> = desired.iter().collect();
        let mut kept = Vec::with_capacity(current.len());
        let mut cancels = Vec::new();

        for order in current {
            let matched = unmatched.iter().position(|q| {
                q.side == order.side && q.price == order.price && q.size == order.size
            });
            match matched {
                Some(idx) => {
                    unmatched.remove(idx);
                    kept.push(order.clone());
                }
                None => cancels.push(PlannedAction::Cancel(order.clone())),
            }
        }

        let mut actions = cancels;
        actions.extend(unmatched.into_iter().cloned().map(PlannedAction::Place));

        ReconcilePlan { kept, actions }
    }

    /// Execute a plan against the venue.
    ///
    /// Chunks of at most four actions are submitted as independent atomic
    /// groups. Post-only crosses, stale cancels, and reason-less transient
    /// failures skip their chunk; anything else propagates to the caller.
    pub async fn execute<V: VenueRpc + ?Sized>(
        &self,
        rpc: &V,
        plan: ReconcilePlan,
    ) -> Result<ReconcileOutcome> {
        let mut orders = plan.kept;
        let mut had_chunk_errors = false;
        let mut needs_sync = false;

        for chunk in plan.actions.chunks(MAX_ACTIONS_PER_CHUNK) {
            let batch: SmallVec<[VenueAction; MAX_ACTIONS_PER_CHUNK]> = chunk
                .iter()
                .map(|a| a.to_venue_action(&self.market_id))
                .collect();

            match rpc.atomic(&batch).await {
                Ok(results) => {
                    self.apply_chunk_results(chunk, &results, &mut orders, &mut needs_sync);
                }
                Err(err) => {
                    match err.venue_kind() {
                        Some(VenueErrorKind::PostOnlyReject) => {
                            warn!(
                                target: "basis_maker::execution",
                                %err,
                                "chunk crossed after submission, skipping"
                            );
                        }
                        Some(VenueErrorKind::OrderNotFound) => {
                            warn!(
                                target: "basis_maker::execution",
                                %err,
                                "stale cancel in chunk, skipping and requesting sync"
                            );
                            needs_sync = true;
                        }
                        Some(VenueErrorKind::Transient) => {
                            warn!(
                                target: "basis_maker::execution",
                                %err,
                                "venue rejected chunk without a reason, skipping"
                            );
                        }
                        _ => return Err(err),
                    }
                    had_chunk_errors = true;
                    // The skipped chunk's cancels never reached the venue;
                    // those orders are still resting.
                    for action in chunk {
                        if let PlannedAction::Cancel(order) = action {
                            orders.push(order.clone());
                        }
                    }
                }
            }
        }

        Ok(ReconcileOutcome {
            orders,
            had_chunk_errors,
            needs_sync,
        })
    }

    /// Diff and execute in one step.
    pub async fn reconcile<V: VenueRpc + ?Sized>(
        &self,
        rpc: &V,
        current: &[CachedOrder],
        desired: &[Quote],
    ) -> Result<ReconcileOutcome> {
        let plan = self.plan(current, desired);
        if plan.action_count() == 0 {
            debug!(
                target: "basis_maker::execution",
                kept = plan.kept.len(),
                "reconcile no-op, resting orders already match"
            );
            return Ok(ReconcileOutcome {
                orders: plan.kept,
                had_chunk_errors: false,
                needs_sync: false,
            });
        }
        debug!(
            target: "basis_maker::execution",
            kept = plan.kept.len(),
            actions = plan.action_count(),
            "reconciling orders"
        );
        self.execute(rpc, plan).await
    }

    /// Pair a successful chunk's results positionally with its actions.
    fn apply_chunk_results(
        &self,
        chunk: &[PlannedAction],
        results: &[ActionResult],
        orders: &mut Vec<CachedOrder>,
        needs_sync: &mut bool,
    ) {
        for (idx, action) in chunk.iter().enumerate() {
            let PlannedAction::Place(quote) = action else {
                continue;
            };
            match results.get(idx).and_then(|r| r.order_id) {
                Some(order_id) => orders.push(CachedOrder {
                    order_id,
                    side: quote.side,
                    price: quote.price,
                    size: quote.size,
                }),
                None => {
                    // A place without an id means our view of the chunk is
                    // unreliable; resync rather than guess.
                    warn!(
                        target: "basis_maker::execution",
                        side = %quote.side,
                        price = %quote.price,
                        "place result missing order id, requesting sync"
                    );
                    *needs_sync = true;
                }
            }
        }
    }
}

/// Count bids and asks in a cached order set, for status lines.
pub fn count_by_side(orders: &[CachedOrder]) -> (usize, usize) {
    let bids = orders.iter().filter(|o| o.side == Side::Bid).count();
    (bids, orders.len() - bids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: u64, side: Side, price: &str, size: &str) -> CachedOrder {
        CachedOrder {
            order_id: id,
            side,
            price: price.parse().unwrap(),
            size: size.parse().unwrap(),
        }
    }

    fn quote(side: Side, price: &str, size: &str) -> Quote {
        Quote {
            side,
            price: price.parse().unwrap(),
            size: size.parse().unwrap(),
        }
    }

    fn reconciler() -> OrderReconciler {
        OrderReconciler::new(Arc::from("ETH-PERP"))
    }

    #[test]
    fn test_minimal_diff_keeps_matches() {
        // Keep the matching bid, cancel the stale ask, place the new ask.
        let current = vec![
            order(1, Side::Bid, "100", "1"),
            order(2, Side::Ask, "101", "1"),
        ];
        let desired = vec![
            quote(Side::Bid, "100", "1"),
            quote(Side::Ask, "102", "1"),
        ];
        let plan = reconciler().plan(&current, &desired);
        assert_eq!(plan.kept.len(), 1);
        assert_eq!(plan.kept[0].order_id, 1);
        assert_eq!(plan.action_count(), 2);
        assert!(matches!(plan.actions[0], PlannedAction::Cancel(ref o) if o.order_id == 2));
        assert!(matches!(plan.actions[1], PlannedAction::Place(ref q) if q.price == dec!(102)));
    }

    #[test]
    fn test_identical_sets_plan_nothing() {
        // An exact match issues zero actions.
        let current = vec![
            order(1, Side::Bid, "100", "1"),
            order(2, Side::Ask, "101", "1"),
        ];
        let desired = vec![
            quote(Side::Bid, "100", "1"),
            quote(Side::Ask, "101", "1"),
        ];
        let plan = reconciler().plan(&current, &desired);
        assert_eq!(plan.action_count(), 0);
        assert_eq!(plan.kept.len(), 2);
    }

    #[test]
    fn test_size_change_is_cancel_plus_place() {
        let current = vec![order(1, Side::Bid, "100", "1")];
        let desired = vec![quote(Side::Bid, "100", "2")];
        let plan = reconciler().plan(&current, &desired);
        assert_eq!(plan.action_count(), 2);
    }

    #[test]
    fn test_duplicate_quotes_match_distinct_orders() {
        // Each order consumes at most one desired quote.
        let current = vec![
            order(1, Side::Bid, "100", "1"),
            order(2, Side::Bid, "100", "1"),
        ];
        let desired = vec![
            quote(Side::Bid, "100", "1"),
            quote(Side::Bid, "100", "1"),
        ];
        let plan = reconciler().plan(&current, &desired);
        assert_eq!(plan.action_count(), 0);
        assert_eq!(plan.kept.len(), 2);
    }

    #[test]
    fn test_cancels_precede_places() {
        let current = vec![order(1, Side::Bid, "99", "1")];
        let desired = vec![
            quote(Side::Bid, "100", "1"),
            quote(Side::Ask, "101", "1"),
        ];
        let plan = reconciler().plan(&current, &desired);
        assert!(matches!(plan.actions[0], PlannedAction::Cancel(_)));
        assert!(plan.actions[1..]
            .iter()
            .all(|a| matches!(a, PlannedAction::Place(_))));
    }
}
