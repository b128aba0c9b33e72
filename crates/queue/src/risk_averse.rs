//! Risk-averse queue model.
//!
//! The order joins behind everything visible at its price and only trades
//! move it forward. Depth growth is assumed to queue behind the order and
//! cancellations are assumed to come from the tail, so neither advances it.

use crate::model::QueuePosition;

/// Trade-driven queue position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskAverseQueue {
    /// Quantity ahead of the order at insertion.
    ahead_at_insert: f64,
    /// Trade quantity printed at the level since insertion.
    traded: f64,
}

impl RiskAverseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trade quantity printed at the level since insertion.
    pub fn traded(&self) -> f64 {
        self.traded
    }
}

impl QueuePosition for RiskAverseQueue {
    fn new_order(&mut self, level_qty: f64) {
        self.ahead_at_insert = level_qty;
        self.traded = 0.0;
    }

    fn trade(&mut self, qty: f64) -> f64 {
        let ahead = self.queue_ahead();
        self.traded += qty;
        (qty - ahead).max(0.0)
    }

    fn depth(&mut self, _prev_qty: f64, _new_qty: f64) {}

    fn is_filled(&self) -> bool {
        self.traded >= self.ahead_at_insert
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn queue_ahead(&self) -> f64 {
        (self.ahead_at_insert - self.traded).max(0.0)
    }
}
