//! Error types for the queuefill system.

use crate::types::{OrderId, PriceTick};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the queuefill system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Order rejected at submission (bad price or quantity).
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Handle was never issued by this engine.
    #[error("Unknown order {0}")]
    UnknownOrder(OrderId),

    /// Handle refers to an order that is no longer resting.
    #[error("Order {0} is not open")]
    OrderNotOpen(OrderId),

    /// Modeling bug: the simulation cannot continue.
    #[error("Invariant violation (order {order_id:?}, price tick {price_tick:?}): {detail}")]
    InvariantViolation {
        order_id: Option<OrderId>,
        price_tick: Option<PriceTick>,
        detail: String,
    },

    /// The engine stopped after a fatal error.
    #[error("Simulation halted: {0}")]
    Halted(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an order rejection.
    pub fn invalid_order(msg: impl Into<String>) -> Self {
        Error::InvalidOrder(msg.into())
    }

    /// Create an invariant violation.
    pub fn invariant(
        order_id: Option<OrderId>,
        price_tick: Option<PriceTick>,
        detail: impl Into<String>,
    ) -> Self {
        Error::InvariantViolation {
            order_id,
            price_tick,
            detail: detail.into(),
        }
    }

    /// Whether the error must stop the simulation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvariantViolation { .. } | Error::Halted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::invariant(Some(OrderId(3)), Some(100), "negative").is_fatal());
        assert!(Error::Halted("x".into()).is_fatal());
        assert!(!Error::invalid_order("qty").is_fatal());
        assert!(!Error::UnknownOrder(OrderId(9)).is_fatal());
    }

    #[test]
    fn test_invariant_message_names_order_and_level() {
        let msg = Error::invariant(Some(OrderId(7)), Some(2001), "front is -1").to_string();
        assert!(msg.contains("OrderId(7)"));
        assert!(msg.contains("2001"));
        assert!(msg.contains("front is -1"));
    }
}
