//! Property-Based Tests for the retention model and stage machine
//!
//! Invariants:
//! - Due date inverse: p(t_due) = τ for any valid stability
//! - Stability bounds: every update lands in [S_min, S_max]
//! - Direction: success never shrinks stability, a miss never grows it
//! - Stage changes move at most one step and never discard mode state

use proptest::prelude::*;

use lexi_engine::retention::{
    due_date, elapsed_days, max_stability, recall_probability, update_accuracy, update_stability,
    DAY_MS, MIN_STABILITY, MISS_PENALTY, TARGET_RECALL,
};
use lexi_engine::stage::{maybe_demote, maybe_promote};
use lexi_engine::{ItemStats, Mode, ScheduleSettings};

const FIXED_TIMESTAMP: i64 = 1_700_000_000_000;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_stability() -> impl Strategy<Value = f64> {
    (MIN_STABILITY..=400.0f64)
}

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Recognition),
        Just(Mode::Chunking),
        Just(Mode::Composing),
    ]
}

fn arb_item_stats() -> impl Strategy<Value = ItemStats> {
    (
        arb_mode(),                         // stage
        arb_stability(),                    // recognition stability
        arb_stability(),                    // chunking stability
        arb_f64_0_1(),                      // recognition q
        arb_f64_0_1(),                      // chunking q
        arb_f64_0_1(),                      // composing q
        (0u32..=30u32),                     // n
    )
        .prop_map(|(stage, s_rec, s_chunk, q_rec, q_chunk, q_comp, n)| {
            let mut stats = ItemStats::new("item", FIXED_TIMESTAMP);
            stats.introduced = true;
            stats.stage = stage;
            stats.recognition.stability = s_rec;
            stats.recognition.q = q_rec;
            stats.recognition.n = n;
            stats.chunking.stability = s_chunk;
            stats.chunking.q = q_chunk;
            stats.chunking.n = n;
            stats.composing.q = q_comp;
            stats
        })
}

fn step(mode: Mode) -> i32 {
    match mode {
        Mode::Recognition => 0,
        Mode::Chunking => 1,
        Mode::Composing => 2,
    }
}

// ============================================================================
// Retention properties
// ============================================================================

proptest! {
    #[test]
    fn prop_due_date_is_inverse_of_curve(s in arb_stability()) {
        let due = due_date(FIXED_TIMESTAMP, s);
        let p = recall_probability((due - FIXED_TIMESTAMP) as f64 / DAY_MS, s);
        prop_assert!((p - TARGET_RECALL).abs() < 1e-6);
    }

    #[test]
    fn prop_recall_in_unit_interval(
        s in arb_stability(),
        elapsed_ms in 0i64..(400 * DAY_MS as i64),
    ) {
        let p = recall_probability(elapsed_days(FIXED_TIMESTAMP, FIXED_TIMESTAMP + elapsed_ms), s);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn prop_stability_stays_in_bounds(
        s in arb_stability(),
        p in arb_f64_0_1(),
        eta in 0.0f64..2.0,
        correct in any::<bool>(),
        max_days in 0.01f64..365.0,
    ) {
        let s_max = max_stability(max_days);
        let next = update_stability(s, correct, p, eta, MISS_PENALTY, s_max);
        prop_assert!(next >= MIN_STABILITY);
        prop_assert!(next <= s_max + 1e-9);
    }

    #[test]
    fn prop_update_direction(
        s in (MIN_STABILITY..=50.0f64),
        p in arb_f64_0_1(),
        eta in 0.0f64..1.0,
    ) {
        let s_max = max_stability(10_000.0);
        prop_assert!(update_stability(s, true, p, eta, MISS_PENALTY, s_max) >= s - 1e-9);
        prop_assert!(update_stability(s, false, p, eta, MISS_PENALTY, s_max) <= s + 1e-9);
    }

    #[test]
    fn prop_accuracy_stays_in_unit_interval(q in arb_f64_0_1(), hit in any::<bool>()) {
        let next = update_accuracy(q, if hit { 1.0 } else { 0.0 });
        prop_assert!((0.0..=1.0).contains(&next));
    }
}

// ============================================================================
// Stage machine properties
// ============================================================================

proptest! {
    #[test]
    fn prop_promotion_moves_one_step_up(stats in arb_item_stats()) {
        let settings = ScheduleSettings::default();
        let before = stats.clone();
        let mut after = stats;
        match maybe_promote(&mut after, &settings, FIXED_TIMESTAMP) {
            Some(stage) => {
                prop_assert_eq!(step(stage) - step(before.stage), 1);
                prop_assert_eq!(after.stage, stage);
                // Source mode untouched
                prop_assert_eq!(after.mode(before.stage), before.mode(before.stage));
            }
            None => prop_assert_eq!(&after, &before),
        }
    }

    #[test]
    fn prop_demotion_moves_one_step_down(stats in arb_item_stats(), answered in arb_mode()) {
        let before = stats.clone();
        let mut after = stats;
        match maybe_demote(&mut after, answered) {
            Some(stage) => {
                prop_assert_eq!(step(before.stage) - step(stage), 1);
                prop_assert_eq!(&after.recognition, &before.recognition);
                prop_assert_eq!(&after.chunking, &before.chunking);
                prop_assert_eq!(&after.composing, &before.composing);
            }
            None => prop_assert_eq!(after.stage, before.stage),
        }
    }
}
