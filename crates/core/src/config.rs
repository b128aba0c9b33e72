//! Configuration structures for the queuefill system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for one simulated instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Instrument configuration.
    #[serde(default)]
    pub instrument: InstrumentConfig,
    /// Exchange fill policy configuration.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Queue position model selection.
    #[serde(default)]
    pub queue: QueueModelKind,
}

impl Config {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<()> {
        let tick_size = self.instrument.tick_size;
        let lot_size = self.instrument.lot_size;
        if !(tick_size.is_finite() && tick_size > 0.0) {
            return Err(Error::config(format!("tick_size must be positive, got {tick_size}")));
        }
        if !(lot_size.is_finite() && lot_size > 0.0) {
            return Err(Error::config(format!("lot_size must be positive, got {lot_size}")));
        }
        if let QueueModelKind::Prob {
            function: PositionFunctionKind::Power { n },
            ..
        } = self.queue
        {
            if !(n.is_finite() && n > 0.0) {
                return Err(Error::config(format!("power exponent must be positive, got {n}")));
            }
        }
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Trading symbol (e.g., "BTCUSDT").
    pub symbol: String,
    /// Tick size (minimum price increment).
    pub tick_size: f64,
    /// Lot size (minimum quantity increment).
    pub lot_size: f64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            tick_size: 0.1,
            lot_size: 0.001,
        }
    }
}

/// How liquidity-taking and maker executions are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillPolicy {
    /// Every execution fills the whole remaining quantity.
    #[default]
    NoPartialFill,
    /// Executions are capped by the visible book or trade quantity.
    PartialFill,
}

/// Exchange model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Fill policy for the whole run.
    pub policy: FillPolicy,
    /// Log a warning when a taking fill exceeds visible depth.
    pub warn_on_unrealistic_fill: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            policy: FillPolicy::NoPartialFill,
            warn_on_unrealistic_fill: true,
        }
    }
}

/// How a depth decrease is split between the front and the back of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbVariant {
    /// `f(back) / (f(front) + f(back))`.
    #[default]
    Split,
    /// `f(back) / f(front + back)`.
    Total,
    /// `1 - f(front / (front + back))`.
    Complement,
}

/// Shape of the probabilistic position function.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionFunctionKind {
    /// `f(x) = x`.
    #[default]
    Identity,
    /// `f(x) = x^2`.
    Square,
    /// `f(x) = x^n`.
    Power { n: f64 },
    /// `f(x) = ln(1 + x) / ln(2)`.
    Log,
}

/// Queue position model selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum QueueModelKind {
    /// Only trades advance the queue position.
    #[default]
    RiskAverse,
    /// Depth decreases advance the position probabilistically.
    Prob {
        variant: ProbVariant,
        function: PositionFunctionKind,
    },
}
