//! Multi-instrument replay.
//!
//! Each instrument owns its engine, book and orders, so instruments are
//! independent and may run in parallel. Within one instrument actions are
//! applied strictly in order.

use crate::{
    engine::ExchangeFillEngine,
    stats::FillStats,
};
use queuefill_core::{
    BookSnapshot, Config, Fill, MarketEvent, OrderId, OrderRequest, Result, Timestamp,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One scripted step of an instrument replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayAction {
    /// Order submission visible to the exchange at `ts`.
    Submit { request: OrderRequest, ts: Timestamp },
    /// Cancel request.
    Cancel { order_id: OrderId },
    /// Price/quantity replacement visible to the exchange at `ts`.
    Modify {
        order_id: OrderId,
        price: f64,
        qty: f64,
        ts: Timestamp,
    },
    /// Replayed market event.
    Market(MarketEvent),
}

/// Full input for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentReplay {
    pub config: Config,
    /// Book state before the first action.
    #[serde(default)]
    pub snapshot: BookSnapshot,
    pub actions: Vec<ReplayAction>,
}

/// Result of replaying one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentOutcome {
    pub symbol: String,
    /// Every execution, in the order it happened.
    pub fills: Vec<Fill>,
    pub stats: FillStats,
    /// Locally rejected actions (invalid orders, unknown handles).
    pub rejections: Vec<String>,
}

/// Replay one instrument to completion.
///
/// Local rejections are recorded and the replay continues. A fatal error
/// ends this instrument and is returned.
pub fn replay(input: &InstrumentReplay) -> Result<InstrumentOutcome> {
    let mut engine = ExchangeFillEngine::new(input.config.clone())?;
    engine.apply_snapshot(&input.snapshot)?;

    let mut fills = Vec::new();
    let mut rejections = Vec::new();
    for (step, action) in input.actions.iter().enumerate() {
        let result = match action {
            ReplayAction::Submit { request, ts } => engine
                .submit(request.clone(), *ts)
                .map(|sub| fills.extend(sub.fills)),
            ReplayAction::Cancel { order_id } => engine.cancel(*order_id).map(|_| ()),
            ReplayAction::Modify {
                order_id,
                price,
                qty,
                ts,
            } => engine
                .modify(*order_id, *price, *qty, *ts)
                .map(|sub| fills.extend(sub.fills)),
            ReplayAction::Market(event) => engine.process_event(event).map(|f| fills.extend(f)),
        };
        match result {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    symbol = %input.config.instrument.symbol,
                    step,
                    error = %err,
                    "action rejected"
                );
                rejections.push(format!("step {step}: {err}"));
            }
        }
    }

    debug!(
        symbol = %input.config.instrument.symbol,
        fills = fills.len(),
        rejections = rejections.len(),
        "replay finished"
    );
    Ok(InstrumentOutcome {
        symbol: input.config.instrument.symbol.clone(),
        fills,
        stats: engine.stats().clone(),
        rejections,
    })
}

/// Runs independent instrument replays, one task per instrument.
#[derive(Debug, Clone)]
pub struct MultiInstrumentRunner {
    parallel: bool,
}

impl Default for MultiInstrumentRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiInstrumentRunner {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Replay every instrument. Results keep the input order; a fatal error
    /// in one instrument does not affect the others.
    pub fn run(&self, inputs: &[InstrumentReplay]) -> Vec<Result<InstrumentOutcome>> {
        if self.parallel {
            inputs.par_iter().map(replay).collect()
        } else {
            inputs.iter().map(replay).collect()
        }
    }
}

/// Sum the diagnostics of all successful outcomes.
pub fn aggregate_stats(outcomes: &[Result<InstrumentOutcome>]) -> FillStats {
    let mut total = FillStats::new();
    for outcome in outcomes.iter().flatten() {
        total.merge(&outcome.stats);
    }
    total
}
