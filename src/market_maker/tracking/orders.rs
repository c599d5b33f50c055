//! Cache of orders the engine believes are resting on the venue.
//!
//! Owned by the reconciler: mutated only from successful atomic-op results
//! or from an authoritative order sync. Capacity stays O(levels × 2).

use rust_decimal::Decimal;

use crate::venue::{Side, VenueOrder};

/// A resting order as the engine believes it exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedOrder {
    pub order_id: u64,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// The engine's view of its resting orders.
#[derive(Debug, Default)]
pub struct OrderCache {
    orders: Vec<CachedOrder>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self {
            orders: Vec::with_capacity(8),
        }
    }

    pub fn orders(&self) -> &[CachedOrder] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Replace the cache with a reconcile result.
    pub fn replace(&mut self, orders: Vec<CachedOrder>) {
        self.orders = orders;
    }

    /// Adopt the venue's authoritative open-order list for one market.
    pub fn sync_from_venue(&mut self, market_id: &str, open_orders: &[VenueOrder]) {
        self.orders = open_orders
            .iter()
            .filter(|o| &*o.market_id == market_id)
            .map(|o| CachedOrder {
                order_id: o.order_id,
                side: o.side,
                price: o.price,
                size: o.size,
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }

    /// Drain the cache, returning the ids to cancel.
    pub fn take_ids(&mut self) -> Vec<u64> {
        let ids = self.orders.iter().map(|o| o.order_id).collect();
        self.orders.clear();
        ids
    }
}
