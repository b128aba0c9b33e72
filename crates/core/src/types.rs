//! Core data types for the queuefill system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange timestamp as delivered by the replay clock.
pub type Timestamp = i64;

/// Price expressed as an integer number of ticks.
pub type PriceTick = i64;

/// Handle of a simulated order, issued by the fill engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order or book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Side {
    /// Bid side.
    Buy = 1,
    /// Ask side.
    Sell = -1,
}

impl Side {
    /// Get the sign as i8.
    #[inline]
    pub fn sign(self) -> i8 {
        self as i8
    }

    /// The other side of the book.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Time-in-force instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good 'till cancel.
    #[default]
    Gtc,
    /// Post only: expires instead of taking liquidity.
    Gtx,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

impl TimeInForce {
    /// Whether the order may rest in the book.
    pub fn may_rest(self) -> bool {
        matches!(self, TimeInForce::Gtc | TimeInForce::Gtx)
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes at its limit price or better.
    #[default]
    Limit,
    /// Takes the opposite book at any price and never rests.
    Market,
}

/// Lifecycle status of a simulated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted and resting with no executions.
    New,
    /// Resting with some quantity executed.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Removed by the user.
    Canceled,
    /// Removed by its time-in-force.
    Expired,
}

impl OrderStatus {
    /// Terminal statuses never receive further events.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Expired
        )
    }
}

/// An order as submitted by the strategy layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Order side.
    pub side: Side,
    /// Limit price. Ignored for market orders.
    #[serde(default)]
    pub price: f64,
    /// Order quantity.
    pub qty: f64,
    /// Time-in-force.
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub order_type: OrderType,
}

impl OrderRequest {
    /// Create a GTC limit order.
    pub fn limit(side: Side, price: f64, qty: f64) -> Self {
        Self {
            side,
            price,
            qty,
            time_in_force: TimeInForce::Gtc,
            order_type: OrderType::Limit,
        }
    }

    /// Create a market order.
    pub fn market(side: Side, qty: f64) -> Self {
        Self {
            side,
            price: 0.0,
            qty,
            time_in_force: TimeInForce::Ioc,
            order_type: OrderType::Market,
        }
    }

    /// Create a GTC limit buy.
    pub fn buy(price: f64, qty: f64) -> Self {
        Self::limit(Side::Buy, price, qty)
    }

    /// Create a GTC limit sell.
    pub fn sell(price: f64, qty: f64) -> Self {
        Self::limit(Side::Sell, price, qty)
    }

    /// Replace the time-in-force.
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

/// Aggregate resting quantity at one price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: f64,
    /// Aggregate quantity as observed in the replayed book.
    pub qty: f64,
}

/// Full-book snapshot used to seed the depth before replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels, any order.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, any order.
    pub asks: Vec<PriceLevel>,
}

/// Quantity change at one price level of the replayed book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthChange {
    /// Book side of the level.
    pub side: Side,
    /// Level price.
    pub price: f64,
    /// Quantity before the change.
    pub old_qty: f64,
    /// Quantity after the change (zero removes the level).
    pub new_qty: f64,
    /// Exchange timestamp.
    pub ts: Timestamp,
}

/// Executed trade from the replayed feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePrint {
    /// Trade price.
    pub price: f64,
    /// Trade quantity.
    pub qty: f64,
    /// Side of the liquidity-taking order.
    pub aggressor: Side,
    /// Exchange timestamp.
    pub ts: Timestamp,
}

/// A single replayed market event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Price-level quantity change.
    Depth(DepthChange),
    /// Trade print.
    Trade(TradePrint),
}

impl MarketEvent {
    /// Exchange timestamp of the event.
    #[inline]
    pub fn ts(&self) -> Timestamp {
        match self {
            MarketEvent::Depth(d) => d.ts,
            MarketEvent::Trade(t) => t.ts,
        }
    }

    /// Event price.
    #[inline]
    pub fn price(&self) -> f64 {
        match self {
            MarketEvent::Depth(d) => d.price,
            MarketEvent::Trade(t) => t.price,
        }
    }
}

impl From<DepthChange> for MarketEvent {
    fn from(change: DepthChange) -> Self {
        MarketEvent::Depth(change)
    }
}

impl From<TradePrint> for MarketEvent {
    fn from(trade: TradePrint) -> Self {
        MarketEvent::Trade(trade)
    }
}

/// Execution of a simulated order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Order that executed.
    pub order_id: OrderId,
    /// Side of the order.
    pub side: Side,
    /// Execution price.
    pub price: f64,
    /// Executed quantity (positive).
    pub qty: f64,
    /// Remaining quantity of the order after this fill.
    pub leaves_qty: f64,
    /// Timestamp of the fill.
    pub ts: Timestamp,
    /// True if the order provided liquidity.
    pub maker: bool,
}

impl Fill {
    /// Executed notional in quote units.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }

    /// Whether this fill completed the order.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.leaves_qty <= 0.0
    }
}
