//! Core types and configuration for the queuefill system.
//!
//! This crate provides shared types used across all other crates:
//! - Order, market event and fill types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
