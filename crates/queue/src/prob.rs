//! Probability-based queue models.
//!
//! Tracks the estimated quantity ahead of (`front`) and behind (`back`) the
//! order. Trades always consume `front` first. Quantity that joins the level
//! goes to `back`. Cancellations are split between the two sides with a
//! probability derived from the relative queue position:
//!
//! - [`ProbVariant::Split`]: `p = f(back) / (f(front) + f(back))`
//! - [`ProbVariant::Total`]: `p = f(back) / f(front + back)`
//! - [`ProbVariant::Complement`]: `p = 1 - f(front / (front + back))`
//!
//! where `p` is the probability that the decrease happened behind the order.
//! Arguments of `f` are normalized by `front + back`.
//!
//! See:
//! * <https://quant.stackexchange.com/questions/3782/how-do-we-estimate-position-of-our-order-in-order-book>
//! * <https://rigtorp.se/2013/06/08/estimating-order-queue-position.html>

use crate::{function::PositionFunction, model::QueuePosition};
use queuefill_core::config::ProbVariant;

/// Probability-based queue position.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbQueue {
    variant: ProbVariant,
    function: PositionFunction,
    front: f64,
    back: f64,
    /// Trade quantity seen since the last depth update. The depth feed also
    /// reflects these trades, so they are netted out of the next change.
    pending_trade_qty: f64,
}

impl ProbQueue {
    pub fn new(variant: ProbVariant, function: PositionFunction) -> Self {
        Self {
            variant,
            function,
            front: 0.0,
            back: 0.0,
            pending_trade_qty: 0.0,
        }
    }

    /// Estimated quantity ahead of the order.
    pub fn front(&self) -> f64 {
        self.front
    }

    /// Estimated quantity behind the order.
    pub fn back(&self) -> f64 {
        self.back
    }

    /// Probability that a cancellation happened behind the order.
    pub fn behind_probability(&self) -> f64 {
        let total = self.front + self.back;
        if total <= 0.0 {
            return 1.0;
        }
        let f = &self.function;
        let front = self.front / total;
        let back = self.back / total;
        let p = match self.variant {
            ProbVariant::Split => f.eval(back) / (f.eval(front) + f.eval(back)),
            ProbVariant::Total => f.eval(back) / f.eval(front + back),
            ProbVariant::Complement => 1.0 - f.eval(front),
        };
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn cancel(&mut self, qty: f64) {
        let p = self.behind_probability();
        let mut front = self.front - (1.0 - p) * qty;
        let mut back = self.back - p * qty;
        // Overflow on one side is taken from the other.
        if back < 0.0 {
            front += back;
            back = 0.0;
        }
        if front < 0.0 {
            back = (back + front).max(0.0);
            front = 0.0;
        }
        self.front = front;
        self.back = back;
    }
}

impl QueuePosition for ProbQueue {
    fn new_order(&mut self, level_qty: f64) {
        self.front = level_qty;
        self.back = 0.0;
        self.pending_trade_qty = 0.0;
    }

    fn trade(&mut self, qty: f64) -> f64 {
        let excess = (qty - self.front).max(0.0);
        self.front = (self.front - qty).max(0.0);
        // Whatever passed the order was taken from behind it.
        self.back = (self.back - excess).max(0.0);
        self.pending_trade_qty += qty;
        excess
    }

    fn depth(&mut self, prev_qty: f64, new_qty: f64) {
        let traded = std::mem::take(&mut self.pending_trade_qty);
        let net = new_qty - prev_qty + traded;
        if net >= 0.0 {
            self.back += net;
        } else {
            self.cancel(-net);
        }

        let new_qty = new_qty.max(0.0);
        if self.front > new_qty {
            self.front = new_qty;
        }
        if self.front + self.back > new_qty {
            self.back = (new_qty - self.front).max(0.0);
        }
    }

    fn is_filled(&self) -> bool {
        self.front <= 0.0
    }

    fn reset(&mut self) {
        self.front = 0.0;
        self.back = 0.0;
        self.pending_trade_qty = 0.0;
    }

    fn queue_ahead(&self) -> f64 {
        self.front
    }

    fn queue_behind(&self) -> Option<f64> {
        Some(self.back)
    }
}
