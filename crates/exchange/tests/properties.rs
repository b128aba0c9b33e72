//! Property tests for fill engine invariants.
//!
//! 1. Remaining quantity never grows and fills never exceed the order
//! 2. Identical input replays to byte-identical fills
//! 3. Cancel is idempotent for every issued handle

use anyhow::Result;
use proptest::prelude::*;
use queuefill_core::{
    config::{
        ExchangeConfig, FillPolicy, InstrumentConfig, PositionFunctionKind, ProbVariant,
        QueueModelKind,
    },
    BookSnapshot, Config, DepthChange, MarketEvent, OrderId, OrderRequest, PriceLevel, Side,
    TimeInForce, TradePrint,
};
use queuefill_exchange::{replay, ExchangeFillEngine, InstrumentReplay, ReplayAction};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

const TICK: f64 = 0.01;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(policy: FillPolicy, queue: QueueModelKind) -> Config {
    Config {
        instrument: InstrumentConfig {
            symbol: "PROP".to_string(),
            tick_size: TICK,
            lot_size: 1.0,
        },
        exchange: ExchangeConfig {
            policy,
            warn_on_unrealistic_fill: false,
        },
        queue,
    }
}

fn price(tick: i64) -> f64 {
    tick as f64 * TICK
}

fn snapshot() -> BookSnapshot {
    BookSnapshot {
        bids: (995..1000)
            .map(|t| PriceLevel { price: price(t), qty: 20.0 })
            .collect(),
        asks: (1000..1005)
            .map(|t| PriceLevel { price: price(t), qty: 20.0 })
            .collect(),
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn arb_policy() -> impl Strategy<Value = FillPolicy> {
    prop_oneof![Just(FillPolicy::NoPartialFill), Just(FillPolicy::PartialFill)]
}

fn arb_queue() -> impl Strategy<Value = QueueModelKind> {
    prop_oneof![
        Just(QueueModelKind::RiskAverse),
        Just(QueueModelKind::Prob {
            variant: ProbVariant::Split,
            function: PositionFunctionKind::Identity,
        }),
        Just(QueueModelKind::Prob {
            variant: ProbVariant::Total,
            function: PositionFunctionKind::Power { n: 3.0 },
        }),
        Just(QueueModelKind::Prob {
            variant: ProbVariant::Complement,
            function: PositionFunctionKind::Log,
        }),
    ]
}

fn arb_tif() -> impl Strategy<Value = TimeInForce> {
    prop_oneof![
        4 => Just(TimeInForce::Gtc),
        1 => Just(TimeInForce::Gtx),
        1 => Just(TimeInForce::Ioc),
        1 => Just(TimeInForce::Fok),
    ]
}

/// Actions without timestamps; the index in the script is the timestamp.
#[derive(Debug, Clone)]
enum Step {
    Submit(Side, i64, u32, TimeInForce),
    Market(Side, u32),
    Depth(Side, i64, u32),
    Trade(Side, i64, u32),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (arb_side(), 993..1008_i64, 1..15_u32, arb_tif())
            .prop_map(|(s, t, q, tif)| Step::Submit(s, t, q, tif)),
        1 => (arb_side(), 1..15_u32).prop_map(|(s, q)| Step::Market(s, q)),
        4 => (arb_side(), 993..1008_i64, 0..40_u32).prop_map(|(s, t, q)| Step::Depth(s, t, q)),
        4 => (arb_side(), 993..1008_i64, 0..25_u32).prop_map(|(s, t, q)| Step::Trade(s, t, q)),
    ]
}

fn script(config: Config, steps: &[Step]) -> InstrumentReplay {
    let actions = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let ts = i as i64;
            match *step {
                Step::Submit(side, tick, qty, tif) => ReplayAction::Submit {
                    request: OrderRequest::limit(side, price(tick), qty as f64)
                        .with_time_in_force(tif),
                    ts,
                },
                Step::Market(side, qty) => ReplayAction::Submit {
                    request: OrderRequest::market(side, qty as f64),
                    ts,
                },
                Step::Depth(side, tick, qty) => {
                    ReplayAction::Market(MarketEvent::Depth(DepthChange {
                        side,
                        price: price(tick),
                        old_qty: 0.0,
                        new_qty: qty as f64,
                        ts,
                    }))
                }
                Step::Trade(aggressor, tick, qty) => {
                    ReplayAction::Market(MarketEvent::Trade(TradePrint {
                        price: price(tick),
                        qty: qty as f64,
                        aggressor,
                        ts,
                    }))
                }
            }
        })
        .collect();
    InstrumentReplay {
        config,
        snapshot: snapshot(),
        actions,
    }
}

/// Original quantity per handle; handles are issued in submission order.
fn submitted_qty(steps: &[Step]) -> BTreeMap<OrderId, f64> {
    steps
        .iter()
        .filter_map(|step| match *step {
            Step::Submit(_, _, qty, _) | Step::Market(_, qty) => Some(qty as f64),
            _ => None,
        })
        .enumerate()
        .map(|(i, qty)| (OrderId(i as u64 + 1), qty))
        .collect()
}

proptest! {
    #[test]
    fn fills_never_exceed_orders(
        policy in arb_policy(),
        queue in arb_queue(),
        steps in prop::collection::vec(arb_step(), 1..80),
    ) {
        init_tracing();
        let outcome = replay(&script(config(policy, queue), &steps));
        prop_assert!(outcome.is_ok(), "replay failed: {:?}", outcome.as_ref().err());
        let outcome = outcome.unwrap();
        prop_assert!(outcome.rejections.is_empty());

        let original = submitted_qty(&steps);
        let mut leaves: BTreeMap<OrderId, f64> = original.clone();
        for fill in &outcome.fills {
            prop_assert!(fill.qty > 0.0);
            let remaining = leaves.get_mut(&fill.order_id);
            prop_assert!(remaining.is_some(), "fill for unknown order {}", fill.order_id);
            let remaining = remaining.unwrap();
            prop_assert!(fill.leaves_qty <= *remaining + 1e-9);
            prop_assert!((*remaining - fill.qty - fill.leaves_qty).abs() < 1e-9);
            *remaining = fill.leaves_qty;
        }
        for (id, qty) in &original {
            let filled: f64 = outcome
                .fills
                .iter()
                .filter(|f| f.order_id == *id)
                .map(|f| f.qty)
                .sum();
            prop_assert!(filled <= qty + 1e-9);
        }
    }

    #[test]
    fn cancel_is_idempotent(
        policy in arb_policy(),
        steps in prop::collection::vec(arb_step(), 1..40),
    ) {
        let input = script(config(policy, QueueModelKind::RiskAverse), &steps);
        let mut engine = ExchangeFillEngine::new(input.config.clone()).unwrap();
        engine.apply_snapshot(&input.snapshot).unwrap();
        let mut issued = 0;
        for action in &input.actions {
            match action {
                ReplayAction::Submit { request, ts } => {
                    engine.submit(request.clone(), *ts).unwrap();
                    issued += 1;
                }
                ReplayAction::Market(event) => {
                    engine.process_event(event).unwrap();
                }
                _ => {}
            }
        }
        for id in 1..=issued {
            let id = OrderId(id);
            let open = engine.order(id).is_some();
            prop_assert_eq!(engine.cancel(id).unwrap(), open);
            prop_assert!(!engine.cancel(id).unwrap());
        }
        prop_assert_eq!(engine.open_order_count(), 0);
        prop_assert!(!engine.is_halted());
    }
}

#[test]
fn replay_is_deterministic() -> Result<()> {
    init_tracing();
    let steps: Vec<Step> = (0..200_i64)
        .map(|i| match i % 5 {
            0 => Step::Submit(
                if i % 2 == 0 { Side::Buy } else { Side::Sell },
                995 + i % 10,
                (1 + i % 7) as u32,
                TimeInForce::Gtc,
            ),
            1 | 2 => Step::Depth(
                if i % 3 == 0 { Side::Buy } else { Side::Sell },
                995 + (i * 7) % 10,
                (i * 13 % 40) as u32,
            ),
            _ => Step::Trade(
                if i % 4 == 0 { Side::Buy } else { Side::Sell },
                995 + (i * 3) % 10,
                (i * 11 % 25) as u32,
            ),
        })
        .collect();
    let queue = QueueModelKind::Prob {
        variant: ProbVariant::Split,
        function: PositionFunctionKind::Log,
    };

    for policy in [FillPolicy::NoPartialFill, FillPolicy::PartialFill] {
        let input = script(config(policy, queue), &steps);
        let first = replay(&input)?;
        let second = replay(&input)?;
        assert!(!first.fills.is_empty());
        assert_eq!(serde_json::to_vec(&first.fills)?, serde_json::to_vec(&second.fills)?);
        assert_eq!(first.stats, second.stats);
    }
    Ok(())
}
