//! Exchange fill engine.
//!
//! Replays depth changes and trade prints of one instrument against the
//! simulated orders and decides which of them execute. The replayed book is
//! never altered by simulated executions (no market impact).
//!
//! Crossing conditions are shared by both fill policies:
//! - A buy crosses when its price is at or above the best ask, or strictly
//!   above the price of a sell-aggressor trade print.
//! - A sell crosses when its price is at or below the best bid, or strictly
//!   below the price of a buy-aggressor trade print.
//!
//! Orders resting at the print price execute once their queue model reports
//! them at the front. [`FillPolicy::NoPartialFill`] then fills the whole
//! remaining quantity; [`FillPolicy::PartialFill`] caps every execution at the
//! quantity actually visible in the book or the trade.

use crate::{
    registry::{OrderRegistry, OrderState, RestingOrder},
    stats::FillStats,
};
use queuefill_book::{MarketDepth, TickGrid};
use queuefill_core::{
    config::FillPolicy, BookSnapshot, Config, DepthChange, Error, Fill, MarketEvent, OrderId,
    OrderRequest, OrderStatus, OrderType, PriceTick, Result, Side, TimeInForce, Timestamp,
    TradePrint,
};
use queuefill_queue::{QueueModelBuilder, QueueModelFactory, QueuePosition};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, warn};

/// Result of accepting a new or modified order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Handle of the order.
    pub order_id: OrderId,
    /// Status right after acceptance.
    pub status: OrderStatus,
    /// Immediate executions against the book.
    pub fills: Vec<Fill>,
}

/// Fill simulation for one instrument.
#[derive(Debug)]
pub struct ExchangeFillEngine {
    config: Config,
    grid: TickGrid,
    depth: MarketDepth,
    orders: OrderRegistry,
    /// Final status of orders that left the registry.
    closed: BTreeMap<OrderId, OrderStatus>,
    queue_models: QueueModelBuilder,
    next_order_id: u64,
    /// Timestamp of the last processed market event.
    clock: Option<Timestamp>,
    stats: FillStats,
    /// Set once a fatal error stopped the simulation.
    halted: Option<String>,
}

impl ExchangeFillEngine {
    /// Create an engine using the queue model selected in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let queue_models = QueueModelBuilder::from(config.queue);
        Self::build(config, queue_models)
    }

    /// Create an engine whose orders use a user-supplied queue model.
    pub fn with_queue_factory(config: Config, factory: Arc<dyn QueueModelFactory>) -> Result<Self> {
        Self::build(config, QueueModelBuilder::Custom(factory))
    }

    fn build(config: Config, queue_models: QueueModelBuilder) -> Result<Self> {
        config.validate()?;
        let grid = TickGrid::from_config(&config.instrument)?;
        Ok(Self {
            config,
            grid,
            depth: MarketDepth::new(grid),
            orders: OrderRegistry::new(),
            closed: BTreeMap::new(),
            queue_models,
            next_order_id: 1,
            clock: None,
            stats: FillStats::new(),
            halted: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &TickGrid {
        &self.grid
    }

    /// Replayed book state.
    pub fn depth(&self) -> &MarketDepth {
        &self.depth
    }

    pub fn stats(&self) -> &FillStats {
        &self.stats
    }

    /// Timestamp of the last processed market event.
    pub fn clock(&self) -> Option<Timestamp> {
        self.clock
    }

    /// Reason the engine stopped, if it did.
    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Snapshot of an open order.
    pub fn order(&self, order_id: OrderId) -> Option<OrderState> {
        self.orders.get(order_id).map(RestingOrder::state)
    }

    /// Status of any order issued since the last reset.
    pub fn status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.orders
            .get(order_id)
            .map(|order| order.status)
            .or_else(|| self.closed.get(&order_id).copied())
    }

    /// Snapshots of all open orders, by handle.
    pub fn open_orders(&self) -> Vec<OrderState> {
        self.orders.iter().map(RestingOrder::state).collect()
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.len()
    }

    /// Submit an order that becomes visible to the exchange at `ts`.
    ///
    /// A crossing order takes liquidity first; the remainder rests or
    /// expires according to its time-in-force. Market orders take whatever
    /// the opposite side offers and never rest. Invalid prices and
    /// quantities are rejected without issuing a handle.
    pub fn submit(&mut self, request: OrderRequest, ts: Timestamp) -> Result<Submission> {
        self.ensure_running()?;
        let price_tick = match request.order_type {
            OrderType::Limit => self.validate_price(request.price)?,
            // Limit at the far end of the book.
            OrderType::Market => match request.side {
                Side::Buy => PriceTick::MAX,
                Side::Sell => PriceTick::MIN,
            },
        };
        self.validate_qty(request.qty)?;
        let ts = self.effective_ts(ts);

        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        debug!(
            %order_id,
            side = ?request.side,
            price = request.price,
            qty = request.qty,
            time_in_force = ?request.time_in_force,
            order_type = ?request.order_type,
            ts,
            "submit"
        );

        let queue = self.queue_models.build();
        let order = RestingOrder::new(order_id, &request, price_tick, ts, queue);
        let result = self.accept(order, ts);
        let (status, fills) = self.guard(result)?;
        Ok(Submission {
            order_id,
            status,
            fills,
        })
    }

    /// Cancel an open order.
    ///
    /// Returns `Ok(false)` if the order already left the book (filled,
    /// canceled or expired). Fails only for handles never issued.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<bool> {
        self.ensure_running()?;
        match self.orders.remove(order_id) {
            Some(order) => {
                self.closed.insert(order_id, OrderStatus::Canceled);
                self.stats.canceled_orders += 1;
                debug!(%order_id, leaves_qty = order.leaves_qty, "cancel");
                Ok(true)
            }
            None if self.is_issued(order_id) => Ok(false),
            None => Err(Error::UnknownOrder(order_id)),
        }
    }

    /// Replace the price and open quantity of a resting order.
    ///
    /// Reducing the quantity at the same price keeps the queue position. A
    /// new price or a larger quantity sends the order to the tail of its
    /// level as if newly submitted, which may make it cross.
    pub fn modify(
        &mut self,
        order_id: OrderId,
        price: f64,
        qty: f64,
        ts: Timestamp,
    ) -> Result<Submission> {
        self.ensure_running()?;
        if !self.orders.contains(order_id) {
            return Err(self.missing(order_id));
        }
        let price_tick = self.validate_price(price)?;
        self.validate_qty(qty)?;
        let ts = self.effective_ts(ts);

        let result = self.replace(order_id, price, price_tick, qty, ts);
        let (status, fills) = self.guard(result)?;
        Ok(Submission {
            order_id,
            status,
            fills,
        })
    }

    /// Advance the simulation by one market event.
    pub fn process_event(&mut self, event: &MarketEvent) -> Result<Vec<Fill>> {
        self.ensure_running()?;
        let result = self.dispatch(event);
        self.guard(result)
    }

    /// Replace the replayed book. Resting orders keep their queue state.
    pub fn apply_snapshot(&mut self, snapshot: &BookSnapshot) -> Result<()> {
        self.ensure_running()?;
        let result = self.check_snapshot(snapshot);
        self.guard(result)?;
        self.depth.apply_snapshot(snapshot);
        Ok(())
    }

    /// Drop all orders, book state and diagnostics. Handles restart at 1.
    pub fn reset(&mut self) {
        self.depth.clear(None);
        self.orders.clear();
        self.closed.clear();
        self.next_order_id = 1;
        self.clock = None;
        self.stats = FillStats::new();
        self.halted = None;
    }

    fn policy(&self) -> FillPolicy {
        self.config.exchange.policy
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.halted {
            Some(reason) => Err(Error::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Latch fatal errors.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                error!(error = %err, "simulation halted");
                self.halted = Some(err.to_string());
            }
        }
        result
    }

    fn is_issued(&self, order_id: OrderId) -> bool {
        order_id.0 >= 1 && order_id.0 < self.next_order_id
    }

    fn missing(&self, order_id: OrderId) -> Error {
        if self.is_issued(order_id) {
            Error::OrderNotOpen(order_id)
        } else {
            Error::UnknownOrder(order_id)
        }
    }

    /// Submissions never precede the last processed event.
    fn effective_ts(&self, ts: Timestamp) -> Timestamp {
        self.clock.map_or(ts, |clock| ts.max(clock))
    }

    fn validate_price(&self, price: f64) -> Result<PriceTick> {
        if !self.grid.is_price_aligned(price) {
            return Err(Error::invalid_order(format!(
                "price {price} is not a multiple of tick size {}",
                self.grid.tick_size()
            )));
        }
        Ok(self.grid.price_to_tick(price))
    }

    fn validate_qty(&self, qty: f64) -> Result<()> {
        if !(qty.is_finite() && qty > 0.0) {
            return Err(Error::invalid_order(format!("quantity must be positive, got {qty}")));
        }
        if !self.grid.is_qty_aligned(qty) || self.grid.is_zero_qty(qty) {
            return Err(Error::invalid_order(format!(
                "quantity {qty} is not a multiple of lot size {}",
                self.grid.lot_size()
            )));
        }
        Ok(())
    }

    fn check_snapshot(&self, snapshot: &BookSnapshot) -> Result<()> {
        for level in snapshot.bids.iter().chain(&snapshot.asks) {
            if !(level.qty.is_finite() && level.qty >= 0.0) {
                return Err(Error::invariant(
                    None,
                    Some(self.grid.price_to_tick(level.price)),
                    format!("snapshot level quantity {}", level.qty),
                ));
            }
        }
        Ok(())
    }

    /// Take liquidity if the order crosses, then rest or expire the remainder.
    fn accept(
        &mut self,
        mut order: RestingOrder,
        ts: Timestamp,
    ) -> Result<(OrderStatus, Vec<Fill>)> {
        let mut fills = Vec::new();

        if self.depth.crosses(order.side, order.price_tick) {
            let time_in_force = order.time_in_force;
            match time_in_force {
                TimeInForce::Gtx => {
                    return Ok((self.expire(order, "post-only order would take liquidity"), fills));
                }
                TimeInForce::Fok if self.policy() == FillPolicy::PartialFill => {
                    let available = self.takeable_qty(&order);
                    if self.grid.normalize_qty(order.leaves_qty - available) > 0.0 {
                        let status = self.expire(order, "fill-or-kill quantity not available");
                        return Ok((status, fills));
                    }
                }
                _ => {}
            }
            self.take(&mut order, ts, &mut fills)?;
        }

        if order.status == OrderStatus::Filled {
            self.closed.insert(order.id, OrderStatus::Filled);
            return Ok((OrderStatus::Filled, fills));
        }
        if !order.may_rest() {
            return Ok((self.expire(order, "remainder of immediate order"), fills));
        }

        let level_qty = self.depth.qty_at_tick(order.side, order.price_tick);
        order.queue.new_order(level_qty);
        check_queue(&order)?;
        let status = order.status;
        self.orders.insert(order);
        Ok((status, fills))
    }

    /// Quantity a crossing order could take under partial fills, with the
    /// same per-level lot rounding as [`Self::take`].
    fn takeable_qty(&self, order: &RestingOrder) -> f64 {
        let mut remaining = order.leaves_qty;
        for (_, visible) in self.depth.levels_through(order.side.opposite(), order.price_tick) {
            if self.grid.is_zero_qty(remaining) {
                break;
            }
            remaining -= self.grid.floor_qty(visible.min(remaining));
        }
        order.leaves_qty - remaining
    }

    /// Liquidity-taking executions of a crossing order.
    fn take(
        &mut self,
        order: &mut RestingOrder,
        ts: Timestamp,
        fills: &mut Vec<Fill>,
    ) -> Result<()> {
        let levels = self.depth.levels_through(order.side.opposite(), order.price_tick);
        match self.policy() {
            FillPolicy::NoPartialFill => {
                let Some(&(tick, visible)) = levels.first() else {
                    return Ok(());
                };
                let qty = order.leaves_qty;
                let price = self.grid.tick_to_price(tick);
                let excess = self.grid.normalize_qty(qty - visible);
                if excess > 0.0 {
                    self.stats.record_unrealistic(excess);
                    if self.config.exchange.warn_on_unrealistic_fill {
                        warn!(
                            order_id = %order.id,
                            price,
                            qty,
                            visible,
                            "taking fill exceeds visible liquidity"
                        );
                    }
                }
                fills.push(execute(&self.grid, &mut self.stats, order, price, qty, false, ts)?);
            }
            FillPolicy::PartialFill => {
                for (tick, visible) in levels {
                    if order.status == OrderStatus::Filled {
                        break;
                    }
                    let qty = self.grid.floor_qty(visible.min(order.leaves_qty));
                    if self.grid.is_zero_qty(qty) {
                        continue;
                    }
                    let price = self.grid.tick_to_price(tick);
                    fills.push(execute(&self.grid, &mut self.stats, order, price, qty, false, ts)?);
                }
            }
        }
        Ok(())
    }

    fn replace(
        &mut self,
        order_id: OrderId,
        price: f64,
        price_tick: PriceTick,
        leaves_qty: f64,
        ts: Timestamp,
    ) -> Result<(OrderStatus, Vec<Fill>)> {
        if let Some(order) = self
            .orders
            .get_mut(order_id)
            .filter(|o| o.price_tick == price_tick && leaves_qty <= o.leaves_qty)
        {
            order.qty -= order.leaves_qty - leaves_qty;
            order.leaves_qty = leaves_qty;
            order.price = price;
            debug!(%order_id, leaves_qty, "modify, queue position kept");
            return Ok((order.status, Vec::new()));
        }

        let Some(mut order) = self.orders.remove(order_id) else {
            return Err(Error::UnknownOrder(order_id));
        };
        order.qty = order.filled_qty() + leaves_qty;
        order.leaves_qty = leaves_qty;
        order.price = price;
        order.price_tick = price_tick;
        order.submitted_ts = ts;
        order.queue.reset();
        debug!(%order_id, price, leaves_qty, ts, "modify, queue position lost");
        self.accept(order, ts)
    }

    fn expire(&mut self, mut order: RestingOrder, reason: &str) -> OrderStatus {
        order.status = OrderStatus::Expired;
        self.closed.insert(order.id, OrderStatus::Expired);
        self.stats.expired_orders += 1;
        debug!(order_id = %order.id, leaves_qty = order.leaves_qty, reason, "expire");
        OrderStatus::Expired
    }

    fn dispatch(&mut self, event: &MarketEvent) -> Result<Vec<Fill>> {
        let ts = event.ts();
        if let Some(clock) = self.clock {
            if ts < clock {
                return Err(Error::invariant(
                    None,
                    None,
                    format!("event timestamp {ts} precedes clock {clock}"),
                ));
            }
        }
        self.clock = Some(ts);

        if !event.price().is_finite() {
            warn!(?event, "ignoring event without a finite price");
            return Ok(Vec::new());
        }
        match event {
            MarketEvent::Depth(change) => self.on_depth(change),
            MarketEvent::Trade(trade) => self.on_trade(trade),
        }
    }

    fn on_depth(&mut self, change: &DepthChange) -> Result<Vec<Fill>> {
        let tick = self.grid.price_to_tick(change.price);
        for qty in [change.old_qty, change.new_qty] {
            if !(qty.is_finite() && qty >= 0.0) {
                return Err(Error::invariant(
                    None,
                    Some(tick),
                    format!("{:?} depth quantity {qty}", change.side),
                ));
            }
        }
        let update = self.depth.update(change.side, tick, change.new_qty);

        for order_id in self.orders.ids_at(change.side, tick) {
            if let Some(order) = self.orders.get_mut(order_id) {
                order.queue.depth(update.prev_qty, update.new_qty);
                check_queue(order)?;
            }
        }

        // Liquidity added at or through the price of opposite resting orders.
        let mut fills = Vec::new();
        let mut available = update.new_qty - update.prev_qty;
        if available <= 0.0 {
            return Ok(fills);
        }
        for order_id in self.orders.crossing_ids(change.side.opposite(), tick) {
            let Some(leaves) = self.orders.get(order_id).map(|o| o.leaves_qty) else {
                continue;
            };
            let qty = match self.policy() {
                FillPolicy::NoPartialFill => leaves,
                FillPolicy::PartialFill => {
                    let qty = self.grid.floor_qty(leaves.min(available));
                    available -= qty;
                    qty
                }
            };
            if self.grid.is_zero_qty(qty) {
                break;
            }
            fills.extend(self.fill_resting(order_id, qty, change.ts)?);
        }
        Ok(fills)
    }

    fn on_trade(&mut self, trade: &TradePrint) -> Result<Vec<Fill>> {
        let tick = self.grid.price_to_tick(trade.price);
        if !(trade.qty.is_finite() && trade.qty >= 0.0) {
            return Err(Error::invariant(
                None,
                Some(tick),
                format!("trade quantity {}", trade.qty),
            ));
        }
        let side = trade.aggressor.opposite();
        let partial = self.policy() == FillPolicy::PartialFill;
        let mut available = trade.qty;
        let mut fills = Vec::new();

        // Priced through the print: executes regardless of queue position.
        for order_id in self.orders.through_ids(side, tick) {
            let Some(leaves) = self.orders.get(order_id).map(|o| o.leaves_qty) else {
                continue;
            };
            let qty = if partial {
                self.grid.floor_qty(leaves.min(available))
            } else {
                leaves
            };
            if self.grid.is_zero_qty(qty) {
                break;
            }
            if partial {
                available -= qty;
            }
            fills.extend(self.fill_resting(order_id, qty, trade.ts)?);
        }

        // At the print price: the queue model decides. Trade quantity left by
        // an order carries over to the next one in queue order.
        let mut level_filled = 0.0;
        for order_id in self.orders.ids_at(side, tick) {
            let Some(order) = self.orders.get_mut(order_id) else {
                continue;
            };
            let excess = order.queue.trade(trade.qty);
            check_queue(order)?;
            if !order.queue.is_filled() {
                continue;
            }
            let qty = if partial {
                let reached = (excess - level_filled).min(available);
                self.grid.floor_qty(reached.min(order.leaves_qty))
            } else {
                order.leaves_qty
            };
            if self.grid.is_zero_qty(qty) {
                continue;
            }
            if partial {
                available -= qty;
                level_filled += qty;
            }
            fills.extend(self.fill_resting(order_id, qty, trade.ts)?);
        }
        Ok(fills)
    }

    /// Maker execution of a resting order at its own price.
    fn fill_resting(&mut self, order_id: OrderId, qty: f64, ts: Timestamp) -> Result<Option<Fill>> {
        let Some(order) = self.orders.get_mut(order_id) else {
            return Ok(None);
        };
        let price = order.price;
        let fill = execute(&self.grid, &mut self.stats, order, price, qty, true, ts)?;
        if fill.is_final() {
            self.orders.remove(order_id);
            self.closed.insert(order_id, OrderStatus::Filled);
        }
        Ok(Some(fill))
    }
}

/// Apply one execution to an order.
fn execute(
    grid: &TickGrid,
    stats: &mut FillStats,
    order: &mut RestingOrder,
    price: f64,
    qty: f64,
    maker: bool,
    ts: Timestamp,
) -> Result<Fill> {
    if order.status.is_terminal() {
        return Err(Error::invariant(
            Some(order.id),
            Some(order.price_tick),
            format!("execution on {:?} order", order.status),
        ));
    }
    if !(qty.is_finite() && qty > 0.0) {
        return Err(Error::invariant(
            Some(order.id),
            Some(order.price_tick),
            format!("execution quantity {qty}"),
        ));
    }
    let leaves_qty = grid.normalize_qty(order.leaves_qty - qty);
    if leaves_qty < 0.0 {
        return Err(Error::invariant(
            Some(order.id),
            Some(order.price_tick),
            format!("execution of {qty} exceeds remaining quantity {}", order.leaves_qty),
        ));
    }
    // Sub-lot residue is booked with the final execution.
    let qty = if leaves_qty == 0.0 { order.leaves_qty } else { qty };

    order.leaves_qty = leaves_qty;
    order.status = if leaves_qty > 0.0 {
        OrderStatus::PartiallyFilled
    } else {
        OrderStatus::Filled
    };
    let fill = Fill {
        order_id: order.id,
        side: order.side,
        price,
        qty,
        leaves_qty,
        ts,
        maker,
    };
    stats.record_fill(&fill);
    debug!(order_id = %order.id, price, qty, leaves_qty, maker, ts, "fill");
    Ok(fill)
}

/// Queue estimates must stay finite and non-negative.
fn check_queue(order: &RestingOrder) -> Result<()> {
    let ahead = order.queue.queue_ahead();
    let behind = order.queue.queue_behind().unwrap_or(0.0);
    if ahead.is_finite() && ahead >= 0.0 && behind.is_finite() && behind >= 0.0 {
        return Ok(());
    }
    Err(Error::invariant(
        Some(order.id),
        Some(order.price_tick),
        format!("queue position out of range (ahead {ahead}, behind {behind})"),
    ))
}
