//! Fill diagnostics.
//!
//! Counters collected by the fill engine while it runs. Nothing here affects
//! fill decisions.

use queuefill_core::Fill;
use serde::{Deserialize, Serialize};

/// Execution and order-lifecycle counters of one engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillStats {
    /// Fills that provided liquidity.
    pub maker_fills: u64,
    /// Fills that took liquidity.
    pub taker_fills: u64,
    /// Quantity executed as maker.
    pub maker_qty: f64,
    /// Quantity executed as taker.
    pub taker_qty: f64,
    /// Fills that left quantity open.
    pub partial_fills: u64,
    /// Orders removed by their time-in-force.
    pub expired_orders: u64,
    /// Orders removed by the user.
    pub canceled_orders: u64,
    /// Taking fills larger than the visible quantity at the fill price.
    pub unrealistic_fills: u64,
    /// Quantity executed beyond the visible quantity by those fills.
    pub unrealistic_excess_qty: f64,
}

impl FillStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one execution.
    pub fn record_fill(&mut self, fill: &Fill) {
        if fill.maker {
            self.maker_fills += 1;
            self.maker_qty += fill.qty;
        } else {
            self.taker_fills += 1;
            self.taker_qty += fill.qty;
        }
        if !fill.is_final() {
            self.partial_fills += 1;
        }
    }

    /// Count a taking fill that exceeded visible liquidity by `excess`.
    pub fn record_unrealistic(&mut self, excess: f64) {
        self.unrealistic_fills += 1;
        self.unrealistic_excess_qty += excess;
    }

    /// Total number of executions.
    pub fn total_fills(&self) -> u64 {
        self.maker_fills + self.taker_fills
    }

    /// Total executed quantity.
    pub fn total_qty(&self) -> f64 {
        self.maker_qty + self.taker_qty
    }

    /// Share of executed quantity that provided liquidity (0-1).
    pub fn maker_ratio(&self) -> f64 {
        let total = self.total_qty();
        if total > 0.0 {
            self.maker_qty / total
        } else {
            0.0
        }
    }

    /// Add the counters of another run.
    pub fn merge(&mut self, other: &FillStats) {
        self.maker_fills += other.maker_fills;
        self.taker_fills += other.taker_fills;
        self.maker_qty += other.maker_qty;
        self.taker_qty += other.taker_qty;
        self.partial_fills += other.partial_fills;
        self.expired_orders += other.expired_orders;
        self.canceled_orders += other.canceled_orders;
        self.unrealistic_fills += other.unrealistic_fills;
        self.unrealistic_excess_qty += other.unrealistic_excess_qty;
    }
}
