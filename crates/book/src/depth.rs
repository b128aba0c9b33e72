//! Aggregate market depth (Market-By-Price).
//!
//! Holds the replayed book only. Simulated orders are never added here since
//! the replayed market cannot see them.

use crate::grid::TickGrid;
use queuefill_core::{BookSnapshot, PriceLevel, PriceTick, Side};
use std::collections::BTreeMap;

/// Result of applying a quantity change to one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUpdate {
    /// Tick of the updated level.
    pub price_tick: PriceTick,
    /// Quantity held before the update.
    pub prev_qty: f64,
    /// Quantity held after the update.
    pub new_qty: f64,
}

/// Per-level aggregate depth for both sides of one instrument.
#[derive(Debug, Clone)]
pub struct MarketDepth {
    grid: TickGrid,
    bids: BTreeMap<PriceTick, f64>,
    asks: BTreeMap<PriceTick, f64>,
}

impl MarketDepth {
    /// Create an empty book.
    pub fn new(grid: TickGrid) -> Self {
        Self {
            grid,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Quantization grid of the book.
    pub fn grid(&self) -> &TickGrid {
        &self.grid
    }

    fn side(&self, side: Side) -> &BTreeMap<PriceTick, f64> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<PriceTick, f64> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Highest bid tick.
    pub fn best_bid_tick(&self) -> Option<PriceTick> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask tick.
    pub fn best_ask_tick(&self) -> Option<PriceTick> {
        self.asks.keys().next().copied()
    }

    /// Best tick of a side.
    pub fn best_tick(&self, side: Side) -> Option<PriceTick> {
        match side {
            Side::Buy => self.best_bid_tick(),
            Side::Sell => self.best_ask_tick(),
        }
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<f64> {
        self.best_bid_tick().map(|t| self.grid.tick_to_price(t))
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<f64> {
        self.best_ask_tick().map(|t| self.grid.tick_to_price(t))
    }

    /// Quantity resting at a tick, zero if the level is absent.
    pub fn qty_at_tick(&self, side: Side, tick: PriceTick) -> f64 {
        self.side(side).get(&tick).copied().unwrap_or(0.0)
    }

    /// Level at a tick, if present.
    pub fn level(&self, side: Side, tick: PriceTick) -> Option<PriceLevel> {
        self.side(side).get(&tick).map(|&qty| PriceLevel {
            price: self.grid.tick_to_price(tick),
            qty,
        })
    }

    /// Number of levels on a side.
    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Whether a `side` order at `tick` would execute against the opposite side.
    pub fn crosses(&self, side: Side, tick: PriceTick) -> bool {
        match side {
            Side::Buy => self.best_ask_tick().is_some_and(|ask| tick >= ask),
            Side::Sell => self.best_bid_tick().is_some_and(|bid| tick <= bid),
        }
    }

    /// Levels of `side` that a marketable order limited at `limit_tick` could
    /// take, best price first.
    pub fn levels_through(&self, side: Side, limit_tick: PriceTick) -> Vec<(PriceTick, f64)> {
        match side {
            Side::Sell => self
                .asks
                .range(..=limit_tick)
                .map(|(&t, &q)| (t, q))
                .collect(),
            Side::Buy => self
                .bids
                .range(limit_tick..)
                .rev()
                .map(|(&t, &q)| (t, q))
                .collect(),
        }
    }

    /// Set the quantity of one level; a zero quantity removes the level.
    pub fn update(&mut self, side: Side, tick: PriceTick, qty: f64) -> LevelUpdate {
        let zero = self.grid.is_zero_qty(qty);
        let book = self.side_mut(side);
        let prev_qty = if zero {
            book.remove(&tick)
        } else {
            book.insert(tick, qty)
        }
        .unwrap_or(0.0);
        LevelUpdate {
            price_tick: tick,
            prev_qty,
            new_qty: if zero { 0.0 } else { qty },
        }
    }

    /// Replace both sides with a snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &BookSnapshot) {
        self.clear(None);
        for level in &snapshot.bids {
            let tick = self.grid.price_to_tick(level.price);
            self.update(Side::Buy, tick, level.qty);
        }
        for level in &snapshot.asks {
            let tick = self.grid.price_to_tick(level.price);
            self.update(Side::Sell, tick, level.qty);
        }
    }

    /// Remove every level of one side, or of both.
    pub fn clear(&mut self, side: Option<Side>) {
        match side {
            Some(side) => self.side_mut(side).clear(),
            None => {
                self.bids.clear();
                self.asks.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn book() -> MarketDepth {
        let mut depth = MarketDepth::new(TickGrid::new(0.01, 1.0).unwrap());
        depth.apply_snapshot(&BookSnapshot {
            bids: vec![
                PriceLevel { price: 9.99, qty: 10.0 },
                PriceLevel { price: 9.98, qty: 20.0 },
            ],
            asks: vec![
                PriceLevel { price: 10.00, qty: 5.0 },
                PriceLevel { price: 10.01, qty: 7.0 },
                PriceLevel { price: 10.03, qty: 9.0 },
            ],
        });
        depth
    }

    #[test]
    fn test_best_prices() {
        let depth = book();
        assert_eq!(depth.best_bid_tick(), Some(999));
        assert_eq!(depth.best_ask_tick(), Some(1000));
        assert_abs_diff_eq!(depth.best_ask().unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(depth.level_count(Side::Sell), 3);
    }

    #[test]
    fn test_update_reports_previous_state() {
        let mut depth = book();
        let update = depth.update(Side::Sell, 999, 4.0);
        assert_eq!(update.prev_qty, 0.0);
        assert_eq!(update.new_qty, 4.0);
        assert_eq!(depth.best_tick(Side::Sell), Some(999));
        assert!(depth.crosses(Side::Buy, 999));
    }

    #[test]
    fn test_zero_qty_removes_level() {
        let mut depth = book();
        let update = depth.update(Side::Sell, 1000, 0.0);
        assert_eq!(update.prev_qty, 5.0);
        assert_eq!(update.new_qty, 0.0);
        assert_eq!(depth.best_ask_tick(), Some(1001));
        assert!(depth.level(Side::Sell, 1000).is_none());
    }

    #[test]
    fn test_crosses() {
        let depth = book();
        assert!(depth.crosses(Side::Buy, 1000));
        assert!(!depth.crosses(Side::Buy, 999));
        assert!(depth.crosses(Side::Sell, 999));
        assert!(!depth.crosses(Side::Sell, 1000));
    }

    #[test]
    fn test_levels_through_best_first() {
        let depth = book();
        assert_eq!(
            depth.levels_through(Side::Sell, 1001),
            vec![(1000, 5.0), (1001, 7.0)]
        );
        assert_eq!(
            depth.levels_through(Side::Buy, 998),
            vec![(999, 10.0), (998, 20.0)]
        );
        assert_eq!(depth.levels_through(Side::Sell, 1003).len(), 3);
    }

    #[test]
    fn test_empty_book_never_crosses() {
        let mut depth = book();
        depth.clear(None);
        assert!(!depth.crosses(Side::Buy, i64::MAX));
        assert!(!depth.crosses(Side::Sell, i64::MIN));
        assert_eq!(depth.best_bid(), None);
    }
}
