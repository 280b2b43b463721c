//! Mode State Machine
//!
//! Three parallel skill states per item: Recognition → Chunking → Composing.
//!
//! - Promotion (after a success) when the stage mode reaches its rule
//!   thresholds, or through the fast track (n ≥ 8, q ≥ 0.92 into Chunking;
//!   n ≥ 10, q ≥ 0.90 into Composing)
//! - Demotion (after a miss) one step down when the answered mode's q ≤ 0.55
//! - Soft override: selection may present the mode below the stage without
//!   recording a demotion
//!
//! Stage changes never discard mode state; only the pointer moves.

use crate::retention::interval_days;
use crate::settings::{PromotionRule, ScheduleSettings};
use crate::types::{ItemStats, Mode, ModeState};

/// Accuracy at or below which an item is demoted / soft-overridden
pub const DEMOTION_ACCURACY: f64 = 0.55;

/// Share of source stability carried into the next mode
const CARRY_STABILITY_FACTOR: f64 = 0.8;

/// Maximum streak carried into the next mode
const CARRY_STREAK_CAP: u32 = 3;

struct FastTrack {
    min_shown: u32,
    min_acc: f64,
}

const FAST_TRACK_CHUNKING: FastTrack = FastTrack {
    min_shown: 8,
    min_acc: 0.92,
};

const FAST_TRACK_COMPOSING: FastTrack = FastTrack {
    min_shown: 10,
    min_acc: 0.90,
};

/// Index of the largest ladder threshold not exceeding the interval implied
/// by `stability`.
pub fn virtual_box(stability: f64, leitner_days: &[f64]) -> usize {
    let days = interval_days(stability);
    let mut current = 0;
    for (i, threshold) in leitner_days.iter().enumerate() {
        if days >= *threshold {
            current = i;
        } else {
            break;
        }
    }
    current
}

fn ready_for(state: &ModeState, rule: &PromotionRule, fast: &FastTrack, ladder: &[f64]) -> bool {
    let by_rule = virtual_box(state.stability, ladder) >= rule.min_box
        && state.n >= rule.min_shown
        && state.q >= rule.min_acc;
    let by_fast_track = state.n >= fast.min_shown && state.q >= fast.min_acc;
    by_rule || by_fast_track
}

/// Seed the destination mode from the source mode on promotion.
///
/// Stability is deliberately under-carried so the new mode needs at least one
/// real review; the presentation counter is left alone.
pub fn carry_forward(src: &ModeState, dst: &mut ModeState, now: i64) {
    dst.q = dst.q.max(src.q);
    dst.stability = dst.stability.max(src.stability * CARRY_STABILITY_FACTOR);
    dst.streak = src.streak.min(CARRY_STREAK_CAP);
    dst.last_seen = now;
    dst.due = now;
}

/// Try to promote the item's stage by one step. Returns the new stage.
pub fn maybe_promote(stats: &mut ItemStats, settings: &ScheduleSettings, now: i64) -> Option<Mode> {
    let (rule, fast) = match stats.stage {
        Mode::Recognition => (&settings.to_chunking, &FAST_TRACK_CHUNKING),
        Mode::Chunking => (&settings.to_composing, &FAST_TRACK_COMPOSING),
        Mode::Composing => return None,
    };
    let next = stats.stage.next()?;

    if !ready_for(stats.active(), rule, fast, &settings.leitner_days) {
        return None;
    }

    let src = stats.active().clone();
    carry_forward(&src, stats.mode_mut(next), now);
    stats.stage = next;
    Some(next)
}

/// Demote one step if the answered mode's accuracy has collapsed.
/// Returns the new stage when it moved.
pub fn maybe_demote(stats: &mut ItemStats, answered: Mode) -> Option<Mode> {
    if stats.mode(answered).q > DEMOTION_ACCURACY {
        return None;
    }
    let lower = stats.stage.lower();
    if lower == stats.stage {
        return None;
    }
    stats.stage = lower;
    Some(lower)
}

/// Mode to present for an item picked by the collector.
///
/// When the stage mode is weak the item is shown one mode lower without
/// touching the stored stage, so `stage` and the presented mode can differ.
pub fn presented_mode(stats: &ItemStats) -> Mode {
    if stats.active().q <= DEMOTION_ACCURACY {
        stats.stage.lower()
    } else {
        stats.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn ladder() -> Vec<f64> {
        ScheduleSettings::default().leitner_days
    }

    #[test]
    fn test_virtual_box() {
        // interval = S * log2(1/0.9) ≈ 0.152 * S
        assert_eq!(virtual_box(0.75, &ladder()), 0);
        assert_eq!(virtual_box(10.0, &ladder()), 1);
        assert_eq!(virtual_box(25.0, &ladder()), 2);
        assert_eq!(virtual_box(400.0, &ladder()), 6);
    }

    #[test]
    fn test_promotion_by_rule() {
        let settings = ScheduleSettings::default();
        let mut stats = ItemStats::new("a", NOW);
        stats.recognition.stability = 50.0; // ≈ 7.6 days → box 3
        stats.recognition.n = 5;
        stats.recognition.q = 0.8;
        stats.recognition.streak = 6;

        assert_eq!(maybe_promote(&mut stats, &settings, NOW), Some(Mode::Chunking));
        assert_eq!(stats.stage, Mode::Chunking);
        assert!((stats.chunking.stability - 40.0).abs() < 1e-9);
        assert_eq!(stats.chunking.q, 0.8);
        assert_eq!(stats.chunking.streak, 3);
        assert_eq!(stats.chunking.due, NOW);
        assert_eq!(stats.chunking.n, 0);
        // source untouched
        assert_eq!(stats.recognition.n, 5);
    }

    #[test]
    fn test_fast_track_promotion() {
        let settings = ScheduleSettings::default();
        let mut stats = ItemStats::new("a", NOW);
        stats.recognition.n = 8;
        stats.recognition.q = 0.93;
        assert_eq!(maybe_promote(&mut stats, &settings, NOW), Some(Mode::Chunking));

        stats.chunking.n = 9;
        stats.chunking.q = 0.95;
        assert_eq!(maybe_promote(&mut stats, &settings, NOW), None);
        stats.chunking.n = 10;
        assert_eq!(maybe_promote(&mut stats, &settings, NOW), Some(Mode::Composing));
        assert_eq!(maybe_promote(&mut stats, &settings, NOW), None);
    }

    #[test]
    fn test_carry_keeps_stronger_destination() {
        let mut dst = ModeState::new(30.0, NOW - 10);
        dst.q = 0.9;
        let mut src = ModeState::new(10.0, NOW - 10);
        src.q = 0.7;
        carry_forward(&src, &mut dst, NOW);
        assert_eq!(dst.stability, 30.0);
        assert_eq!(dst.q, 0.9);
    }

    #[test]
    fn test_demotion_only_moves_pointer() {
        let mut stats = ItemStats::new("a", NOW);
        stats.stage = Mode::Composing;
        stats.composing.q = 0.5;
        stats.composing.stability = 12.0;
        assert_eq!(maybe_demote(&mut stats, Mode::Composing), Some(Mode::Chunking));
        assert_eq!(stats.composing.stability, 12.0);

        stats.stage = Mode::Recognition;
        stats.recognition.q = 0.1;
        assert_eq!(maybe_demote(&mut stats, Mode::Recognition), None);
        assert_eq!(stats.stage, Mode::Recognition);
    }

    #[test]
    fn test_no_demotion_above_threshold() {
        let mut stats = ItemStats::new("a", NOW);
        stats.stage = Mode::Chunking;
        stats.chunking.q = 0.56;
        assert_eq!(maybe_demote(&mut stats, Mode::Chunking), None);
    }

    #[test]
    fn test_soft_override() {
        let mut stats = ItemStats::new("a", NOW);
        stats.stage = Mode::Composing;
        stats.composing.q = 0.55;
        assert_eq!(presented_mode(&stats), Mode::Chunking);
        assert_eq!(stats.stage, Mode::Composing);
        stats.composing.q = 0.6;
        assert_eq!(presented_mode(&stats), Mode::Composing);
    }
}
