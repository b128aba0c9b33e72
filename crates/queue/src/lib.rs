//! Queue position estimation for the queuefill system.
//!
//! Under Market-By-Price data only the aggregate quantity of a level is
//! visible, so the rank of a simulated order inside its level is estimated
//! from depth changes and trades.
//!
//! This crate handles:
//! - Probabilistic position functions
//! - The risk-averse queue model (only trades advance the order)
//! - Probability-based queue models (cancellations split front/back)
//! - The per-order model interface and its builder

pub mod function;
pub mod model;
pub mod prob;
pub mod risk_averse;

pub use function::PositionFunction;
pub use model::{QueueModelBuilder, QueueModelFactory, QueuePosition, QueuePositionModel};
pub use prob::ProbQueue;
pub use risk_averse::RiskAverseQueue;
