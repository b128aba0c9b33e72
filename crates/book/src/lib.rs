//! Replayed order-book state for the queuefill system.
//!
//! This crate handles:
//! - Price/quantity quantization (tick and lot size)
//! - Per-level aggregate depth with best bid/ask tracking
//! - Snapshots and clearing

pub mod depth;
pub mod grid;

pub use depth::{LevelUpdate, MarketDepth};
pub use grid::TickGrid;
