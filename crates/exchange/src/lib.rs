//! Exchange fill simulation for the queuefill system.
//!
//! This crate handles:
//! - The resting-order registry (price-time priority among simulated orders)
//! - The fill engine with no-partial-fill and partial-fill policies
//! - Fill diagnostics
//! - Multi-instrument replay

pub mod engine;
pub mod registry;
pub mod runner;
pub mod stats;

pub use engine::{ExchangeFillEngine, Submission};
pub use registry::{OrderRegistry, OrderState, RestingOrder};
pub use runner::{
    aggregate_stats, replay, InstrumentOutcome, InstrumentReplay, MultiInstrumentRunner,
    ReplayAction,
};
pub use stats::FillStats;
