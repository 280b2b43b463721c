//! Retention Model - continuous-time forgetting curve
//!
//! Core formulas:
//! - Recall probability: p = 2^(-Δt/S)
//!   - Δt: days since the last presentation (floored to one minute)
//!   - S: stability in days
//! - Due date: t_due = now + S · log2(1/τ), the exact inverse of the curve, so
//!   p(t_due) = τ
//! - Stability update (log space):
//!   - g = 1 - p on success, g = -(p + λ) on a miss
//!   - S' = clamp(exp(ln S + η·g), S_min, S_max)
//!   - S_max = maxIntervalDays / log2(1/τ)
//! - Accuracy EWMA: q' = (1-ρ)·q + ρ·r
//!
//! Parameters:
//! - τ = 0.9 (target reliability)
//! - λ = 0.2 (miss penalty)
//! - ρ = 0.2 (accuracy smoothing)
//! - S_min = 0.25 days

use crate::types::Mode;

// ==================== Constants ====================

/// Target reliability at the due date
pub const TARGET_RECALL: f64 = 0.9;

/// Width of the "nearly due" band above the target reliability
pub const NEARLY_DUE_BAND: f64 = 0.05;

/// Extra penalty applied to the gradient of a miss
pub const MISS_PENALTY: f64 = 0.2;

/// EWMA coefficient for accuracy
pub const ACCURACY_RHO: f64 = 0.2;

/// Stability floor (days)
pub const MIN_STABILITY: f64 = 0.25;

/// Ceiling applied when repairing stored records (days)
pub const STABILITY_CEILING: f64 = 36_500.0;

/// Smallest elapsed time considered by the curve: one minute, in days
pub const MIN_ELAPSED_DAYS: f64 = 1.0 / 1440.0;

/// Milliseconds per day
pub const DAY_MS: f64 = 86_400_000.0;

/// Streak from which the learning rate starts adapting
const STREAK_ADAPT_FROM: u32 = 2;

/// Cap on the streak used by the confidence boost
const STREAK_BOOST_CAP: u32 = 5;

/// Per-streak-step learning rate boost on success
const STREAK_BOOST_STEP: f64 = 0.1;

/// Learning rate multiplier for a miss inside a streak
const STREAK_SLIP_FACTOR: f64 = 0.5;

/// log2(1/τ): interval length in units of stability
pub fn interval_factor() -> f64 {
    (1.0 / TARGET_RECALL).log2()
}

/// Predicted recall probability after `elapsed_days` for stability `stability`.
pub fn recall_probability(elapsed_days: f64, stability: f64) -> f64 {
    let s = if stability > 0.0 && stability.is_finite() {
        stability
    } else {
        MIN_STABILITY
    };
    let dt = if elapsed_days.is_finite() {
        elapsed_days.max(0.0)
    } else {
        0.0
    };
    2f64.powf(-dt / s)
}

/// Elapsed days between two millisecond timestamps, floored to one minute.
pub fn elapsed_days(last_seen: i64, now: i64) -> f64 {
    (now.saturating_sub(last_seen) as f64 / DAY_MS).max(MIN_ELAPSED_DAYS)
}

/// Length of the review interval implied by `stability`, in days.
pub fn interval_days(stability: f64) -> f64 {
    stability * interval_factor()
}

/// Length of the review interval implied by `stability`, in milliseconds.
pub fn interval_ms(stability: f64) -> f64 {
    interval_days(stability) * DAY_MS
}

/// Timestamp at which recall probability falls to the target reliability.
///
/// Saturates at `i64::MAX` for absurd stabilities.
pub fn due_date(now: i64, stability: f64) -> i64 {
    now.saturating_add(interval_ms(stability).round() as i64)
}

/// Upper stability bound derived from the max-interval cap.
pub fn max_stability(max_interval_days: f64) -> f64 {
    let s_max = max_interval_days / interval_factor();
    if s_max.is_finite() {
        s_max.max(MIN_STABILITY)
    } else {
        MIN_STABILITY
    }
}

/// Base learning rate per skill mode.
pub fn base_learning_rate(mode: Mode) -> f64 {
    match mode {
        Mode::Recognition => 0.30,
        Mode::Chunking => 0.36,
        Mode::Composing => 0.45,
    }
}

/// Learning rate for one update given the streak *before* this answer.
///
/// Confident runs compound faster; a slip inside a run halves the step
/// instead of resetting growth.
pub fn learning_rate(base: f64, streak: u32, correct: bool) -> f64 {
    if streak < STREAK_ADAPT_FROM {
        return base;
    }
    if correct {
        base * (1.0 + STREAK_BOOST_STEP * streak.min(STREAK_BOOST_CAP) as f64)
    } else {
        base * STREAK_SLIP_FACTOR
    }
}

/// Log-space stability update.
///
/// # Arguments
/// * `prev_stability` - stability before the answer (days)
/// * `correct` - whether the answer was correct
/// * `observed_p` - recall probability at answer time
/// * `learning_rate` - step size η
/// * `miss_penalty` - λ added to the miss gradient
/// * `max_stability` - upper bound S_max
///
/// # Returns
/// New stability in [S_min, S_max]
pub fn update_stability(
    prev_stability: f64,
    correct: bool,
    observed_p: f64,
    learning_rate: f64,
    miss_penalty: f64,
    max_stability: f64,
) -> f64 {
    let s_max = max_stability.max(MIN_STABILITY);
    let prev = if prev_stability > 0.0 && prev_stability.is_finite() {
        prev_stability
    } else {
        MIN_STABILITY
    };
    let p = observed_p.clamp(0.0, 1.0);
    let gradient = if correct { 1.0 - p } else { -(p + miss_penalty) };

    let next = (prev.ln() + learning_rate * gradient).exp();
    if next.is_nan() {
        return MIN_STABILITY;
    }
    next.clamp(MIN_STABILITY, s_max)
}

/// Accuracy EWMA update.
pub fn update_accuracy(q: f64, reward: f64) -> f64 {
    ((1.0 - ACCURACY_RHO) * q + ACCURACY_RHO * reward).clamp(0.0, 1.0)
}
