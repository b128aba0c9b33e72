//! Tick and lot quantization.

use queuefill_core::{config::InstrumentConfig, Error, PriceTick, Result};
use serde::{Deserialize, Serialize};

/// Tolerance for alignment checks, as a fraction of one tick or lot.
const ALIGN_TOLERANCE: f64 = 1e-6;

/// Price and quantity grid of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickGrid {
    tick_size: f64,
    lot_size: f64,
}

impl TickGrid {
    /// Create a grid, rejecting non-positive increments.
    pub fn new(tick_size: f64, lot_size: f64) -> Result<Self> {
        if !(tick_size.is_finite() && tick_size > 0.0) {
            return Err(Error::config(format!("tick_size must be positive, got {tick_size}")));
        }
        if !(lot_size.is_finite() && lot_size > 0.0) {
            return Err(Error::config(format!("lot_size must be positive, got {lot_size}")));
        }
        Ok(Self {
            tick_size,
            lot_size,
        })
    }

    /// Create a grid from instrument configuration.
    pub fn from_config(config: &InstrumentConfig) -> Result<Self> {
        Self::new(config.tick_size, config.lot_size)
    }

    #[inline]
    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    #[inline]
    pub fn lot_size(&self) -> f64 {
        self.lot_size
    }

    /// Nearest tick index of a price.
    #[inline]
    pub fn price_to_tick(&self, price: f64) -> PriceTick {
        (price / self.tick_size).round() as PriceTick
    }

    /// Price of a tick index.
    #[inline]
    pub fn tick_to_price(&self, tick: PriceTick) -> f64 {
        tick as f64 * self.tick_size
    }

    /// Whether the price sits on the tick grid.
    pub fn is_price_aligned(&self, price: f64) -> bool {
        let ticks = price / self.tick_size;
        ticks.is_finite() && (ticks - ticks.round()).abs() <= ALIGN_TOLERANCE
    }

    /// Whether the quantity is a whole number of lots.
    pub fn is_qty_aligned(&self, qty: f64) -> bool {
        let lots = qty / self.lot_size;
        lots.is_finite() && (lots - lots.round()).abs() <= ALIGN_TOLERANCE
    }

    /// Whether the quantity rounds to zero lots.
    #[inline]
    pub fn is_zero_qty(&self, qty: f64) -> bool {
        (qty / self.lot_size).round() == 0.0
    }

    /// Round a quantity down to whole lots.
    #[inline]
    pub fn floor_qty(&self, qty: f64) -> f64 {
        let lots = (qty / self.lot_size + ALIGN_TOLERANCE).floor();
        if lots > 0.0 {
            lots * self.lot_size
        } else {
            0.0
        }
    }

    /// Snap sub-lot residue to exactly zero.
    #[inline]
    pub fn normalize_qty(&self, qty: f64) -> f64 {
        if self.is_zero_qty(qty) {
            0.0
        } else {
            qty
        }
    }
}
