//! Property tests for queue position invariants.
//!
//! 1. Prob models never hold a negative or non-finite front/back
//! 2. Front never moves backwards
//! 3. Front + back only grows on depth growth
//! 4. Risk-averse queue ahead only shrinks

use proptest::prelude::*;
use queuefill_core::config::ProbVariant;
use queuefill_queue::{PositionFunction, ProbQueue, QueuePosition, RiskAverseQueue};

#[derive(Debug, Clone, Copy)]
enum LevelEvent {
    Trade(f64),
    Depth(f64),
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_qty() -> impl Strategy<Value = f64> {
    (0.0..500.0_f64).prop_map(|q| q.round())
}

fn arb_event() -> impl Strategy<Value = LevelEvent> {
    prop_oneof![
        arb_qty().prop_map(|q| LevelEvent::Trade(q / 5.0)),
        arb_qty().prop_map(LevelEvent::Depth),
    ]
}

fn arb_variant() -> impl Strategy<Value = ProbVariant> {
    prop_oneof![
        Just(ProbVariant::Split),
        Just(ProbVariant::Total),
        Just(ProbVariant::Complement),
    ]
}

fn arb_function() -> impl Strategy<Value = PositionFunction> {
    prop_oneof![
        Just(PositionFunction::Identity),
        Just(PositionFunction::Square),
        Just(PositionFunction::Log),
        (0.25..4.0_f64).prop_map(PositionFunction::Power),
    ]
}

proptest! {
    #[test]
    fn prob_queue_stays_non_negative(
        variant in arb_variant(),
        function in arb_function(),
        initial in arb_qty(),
        events in prop::collection::vec(arb_event(), 1..60),
    ) {
        let mut q = ProbQueue::new(variant, function);
        q.new_order(initial);
        let mut level = initial;

        for event in events {
            let front_before = q.front();
            let total_before = q.front() + q.back();
            match event {
                LevelEvent::Trade(qty) => {
                    let excess = q.trade(qty);
                    prop_assert!(excess >= 0.0);
                    prop_assert!(q.front() + q.back() <= total_before + 1e-9);
                }
                LevelEvent::Depth(new_qty) => {
                    q.depth(level, new_qty);
                    level = new_qty;
                    prop_assert!(q.front() + q.back() <= level + 1e-9);
                }
            }
            prop_assert!(q.front().is_finite() && q.front() >= 0.0);
            prop_assert!(q.back().is_finite() && q.back() >= 0.0);
            prop_assert!(q.front() <= front_before + 1e-9);
        }
    }

    #[test]
    fn prob_queue_total_grows_only_with_depth(
        variant in arb_variant(),
        function in arb_function(),
        initial in arb_qty(),
        levels in prop::collection::vec(arb_qty(), 1..60),
    ) {
        let mut q = ProbQueue::new(variant, function);
        q.new_order(initial);
        let mut level = initial;

        for new_qty in levels {
            let total_before = q.front() + q.back();
            q.depth(level, new_qty);
            if new_qty <= level {
                prop_assert!(q.front() + q.back() <= total_before + 1e-9);
            }
            level = new_qty;
        }
    }

    #[test]
    fn risk_averse_ahead_only_shrinks(
        initial in arb_qty(),
        events in prop::collection::vec(arb_event(), 1..60),
    ) {
        let mut q = RiskAverseQueue::new();
        q.new_order(initial);
        let mut level = initial;

        for event in events {
            let before = q.queue_ahead();
            match event {
                LevelEvent::Trade(qty) => {
                    q.trade(qty);
                }
                LevelEvent::Depth(new_qty) => {
                    q.depth(level, new_qty);
                    level = new_qty;
                }
            }
            prop_assert!(q.queue_ahead() >= 0.0);
            prop_assert!(q.queue_ahead() <= before);
            prop_assert_eq!(q.is_filled(), q.queue_ahead() <= 0.0);
        }
    }
}
