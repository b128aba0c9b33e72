//! Queue position model interface.
//!
//! Each resting order owns exactly one model instance. The fill engine feeds
//! it the events of the order's own price level and asks whether the order
//! has reached the front of the queue.

use crate::{function::PositionFunction, prob::ProbQueue, risk_averse::RiskAverseQueue};
use queuefill_core::config::QueueModelKind;
use std::{fmt, sync::Arc};

/// Capability set of a queue position estimator.
///
/// Implementations only see their own price level. All quantities are
/// non-negative; the engine checks [`queue_ahead`](QueuePosition::queue_ahead)
/// and [`queue_behind`](QueuePosition::queue_behind) after every update and
/// halts the simulation if either turns negative or non-finite.
pub trait QueuePosition: fmt::Debug + Send {
    /// Initialize on order insertion. `level_qty` is the replayed quantity
    /// at the order's price, all of which is ahead of the new order.
    fn new_order(&mut self, level_qty: f64);

    /// A trade of `qty` printed at the order's price.
    ///
    /// Returns the part of the trade that reached past the queue ahead of the
    /// order, which is available to execute it.
    fn trade(&mut self, qty: f64) -> f64;

    /// The level quantity changed from `prev_qty` to `new_qty`.
    fn depth(&mut self, prev_qty: f64, new_qty: f64);

    /// Whether the order is at (or past) the front of the queue.
    fn is_filled(&self) -> bool;

    /// Clear all counters, as if no order had been inserted.
    fn reset(&mut self);

    /// Estimated quantity ahead of the order.
    fn queue_ahead(&self) -> f64;

    /// Estimated quantity behind the order, for models that track it.
    fn queue_behind(&self) -> Option<f64> {
        None
    }
}

/// Creates model instances for user-supplied queue logic.
pub trait QueueModelFactory: Send + Sync {
    /// A fresh, uninitialized model for a new order.
    fn create(&self) -> Box<dyn QueuePosition>;
}

/// Per-order queue position state.
#[derive(Debug)]
pub enum QueuePositionModel {
    RiskAverse(RiskAverseQueue),
    Prob(ProbQueue),
    Custom(Box<dyn QueuePosition>),
}

impl QueuePositionModel {
    /// Build an uninitialized model of the configured kind.
    pub fn from_kind(kind: QueueModelKind) -> Self {
        match kind {
            QueueModelKind::RiskAverse => QueuePositionModel::RiskAverse(RiskAverseQueue::new()),
            QueueModelKind::Prob { variant, function } => QueuePositionModel::Prob(ProbQueue::new(
                variant,
                PositionFunction::from(function),
            )),
        }
    }
}

impl QueuePosition for QueuePositionModel {
    fn new_order(&mut self, level_qty: f64) {
        match self {
            QueuePositionModel::RiskAverse(q) => q.new_order(level_qty),
            QueuePositionModel::Prob(q) => q.new_order(level_qty),
            QueuePositionModel::Custom(q) => q.new_order(level_qty),
        }
    }

    fn trade(&mut self, qty: f64) -> f64 {
        match self {
            QueuePositionModel::RiskAverse(q) => q.trade(qty),
            QueuePositionModel::Prob(q) => q.trade(qty),
            QueuePositionModel::Custom(q) => q.trade(qty),
        }
    }

    fn depth(&mut self, prev_qty: f64, new_qty: f64) {
        match self {
            QueuePositionModel::RiskAverse(q) => q.depth(prev_qty, new_qty),
            QueuePositionModel::Prob(q) => q.depth(prev_qty, new_qty),
            QueuePositionModel::Custom(q) => q.depth(prev_qty, new_qty),
        }
    }

    fn is_filled(&self) -> bool {
        match self {
            QueuePositionModel::RiskAverse(q) => q.is_filled(),
            QueuePositionModel::Prob(q) => q.is_filled(),
            QueuePositionModel::Custom(q) => q.is_filled(),
        }
    }

    fn reset(&mut self) {
        match self {
            QueuePositionModel::RiskAverse(q) => q.reset(),
            QueuePositionModel::Prob(q) => q.reset(),
            QueuePositionModel::Custom(q) => q.reset(),
        }
    }

    fn queue_ahead(&self) -> f64 {
        match self {
            QueuePositionModel::RiskAverse(q) => q.queue_ahead(),
            QueuePositionModel::Prob(q) => q.queue_ahead(),
            QueuePositionModel::Custom(q) => q.queue_ahead(),
        }
    }

    fn queue_behind(&self) -> Option<f64> {
        match self {
            QueuePositionModel::RiskAverse(q) => q.queue_behind(),
            QueuePositionModel::Prob(q) => q.queue_behind(),
            QueuePositionModel::Custom(q) => q.queue_behind(),
        }
    }
}

/// Source of per-order models, fixed at engine construction.
#[derive(Clone)]
pub enum QueueModelBuilder {
    /// One of the built-in models.
    Builtin(QueueModelKind),
    /// User-supplied logic.
    Custom(Arc<dyn QueueModelFactory>),
}

impl QueueModelBuilder {
    /// A fresh model for a new order.
    pub fn build(&self) -> QueuePositionModel {
        match self {
            QueueModelBuilder::Builtin(kind) => QueuePositionModel::from_kind(*kind),
            QueueModelBuilder::Custom(factory) => QueuePositionModel::Custom(factory.create()),
        }
    }
}

impl Default for QueueModelBuilder {
    fn default() -> Self {
        QueueModelBuilder::Builtin(QueueModelKind::RiskAverse)
    }
}

impl From<QueueModelKind> for QueueModelBuilder {
    fn from(kind: QueueModelKind) -> Self {
        QueueModelBuilder::Builtin(kind)
    }
}

impl fmt::Debug for QueueModelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueModelBuilder::Builtin(kind) => f.debug_tuple("Builtin").field(kind).finish(),
            QueueModelBuilder::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
