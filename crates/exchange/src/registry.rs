//! Resting-order registry.
//!
//! Orders are keyed by handle and indexed per side and price tick. Within a
//! tick the index keeps submission order, which is the queue order among the
//! simulated orders of that level.

use queuefill_core::{
    OrderId, OrderRequest, OrderStatus, OrderType, PriceTick, Side, TimeInForce, Timestamp,
};
use queuefill_queue::{QueuePosition, QueuePositionModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A simulated order owned by the fill engine.
#[derive(Debug)]
pub struct RestingOrder {
    pub id: OrderId,
    pub side: Side,
    pub price_tick: PriceTick,
    /// Limit price as submitted.
    pub price: f64,
    /// Order quantity, including executed quantity.
    pub qty: f64,
    /// Unfilled quantity.
    pub leaves_qty: f64,
    /// Time the order (last) joined its queue.
    pub submitted_ts: Timestamp,
    pub time_in_force: TimeInForce,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Queue position estimate, discarded with the order.
    pub queue: QueuePositionModel,
}

impl RestingOrder {
    pub fn new(
        id: OrderId,
        request: &OrderRequest,
        price_tick: PriceTick,
        ts: Timestamp,
        queue: QueuePositionModel,
    ) -> Self {
        Self {
            id,
            side: request.side,
            price_tick,
            price: request.price,
            qty: request.qty,
            leaves_qty: request.qty,
            submitted_ts: ts,
            time_in_force: request.time_in_force,
            order_type: request.order_type,
            status: OrderStatus::New,
            queue,
        }
    }

    /// Whether a remainder may join the book after taking liquidity.
    pub fn may_rest(&self) -> bool {
        self.order_type == OrderType::Limit && self.time_in_force.may_rest()
    }

    /// Executed quantity.
    pub fn filled_qty(&self) -> f64 {
        self.qty - self.leaves_qty
    }

    /// Read-only view of the order.
    pub fn state(&self) -> OrderState {
        OrderState {
            id: self.id,
            side: self.side,
            price: self.price,
            qty: self.qty,
            leaves_qty: self.leaves_qty,
            status: self.status,
            time_in_force: self.time_in_force,
            submitted_ts: self.submitted_ts,
            queue_ahead: self.queue.queue_ahead(),
        }
    }
}

/// Snapshot of a resting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub id: OrderId,
    pub side: Side,
    pub price: f64,
    pub qty: f64,
    pub leaves_qty: f64,
    pub status: OrderStatus,
    pub time_in_force: TimeInForce,
    pub submitted_ts: Timestamp,
    /// Estimated quantity ahead of the order.
    pub queue_ahead: f64,
}

/// Open orders of one instrument.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    orders: BTreeMap<OrderId, RestingOrder>,
    bids: BTreeMap<PriceTick, Vec<OrderId>>,
    asks: BTreeMap<PriceTick, Vec<OrderId>>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_mut(&mut self, side: Side) -> &mut BTreeMap<PriceTick, Vec<OrderId>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Add an order at the tail of its level.
    pub fn insert(&mut self, order: RestingOrder) {
        let (id, side, tick) = (order.id, order.side, order.price_tick);
        self.index_mut(side).entry(tick).or_default().push(id);
        self.orders.insert(id, order);
    }

    /// Remove an order and drop it from the level index.
    pub fn remove(&mut self, id: OrderId) -> Option<RestingOrder> {
        let order = self.orders.remove(&id)?;
        let index = self.index_mut(order.side);
        if let Some(ids) = index.get_mut(&order.price_tick) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                index.remove(&order.price_tick);
            }
        }
        Some(order)
    }

    pub fn get(&self, id: OrderId) -> Option<&RestingOrder> {
        self.orders.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut RestingOrder> {
        self.orders.get_mut(&id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Orders resting at one tick, in queue order.
    pub fn ids_at(&self, side: Side, tick: PriceTick) -> Vec<OrderId> {
        let index = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        index.get(&tick).cloned().unwrap_or_default()
    }

    /// Orders of `side` that would trade against liquidity at `tick`: buys at
    /// or above it, sells at or below it. Best price first.
    pub fn crossing_ids(&self, side: Side, tick: PriceTick) -> Vec<OrderId> {
        match side {
            Side::Buy => self
                .bids
                .range(tick..)
                .rev()
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
            Side::Sell => self
                .asks
                .range(..=tick)
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
        }
    }

    /// Orders of `side` priced strictly better than a trade at `tick`.
    /// Best price first.
    pub fn through_ids(&self, side: Side, tick: PriceTick) -> Vec<OrderId> {
        match side {
            Side::Buy => self
                .bids
                .range(tick.saturating_add(1)..)
                .rev()
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
            Side::Sell => self
                .asks
                .range(..tick)
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
        }
    }

    /// All open orders by handle.
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
        self.bids.clear();
        self.asks.clear();
    }
}
