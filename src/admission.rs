//! New-Item Admission Controller
//!
//! pNew = clamp(θ·clamp((B_low - debt)/B_low, 0, 1) + κc·clamp(share - coverage, 0, 1), 0, 1)
//!
//! A small backlog and under-target coverage each push towards introducing
//! new material on their own. One Bernoulli draw per turn decides.
//!
//! Parameters:
//! - B_low = 20 (backlog below which new items are welcome)
//! - θ = 0.7 (backlog weight)
//! - κc = 0.5 (coverage weight)

use rand::Rng;

const BACKLOG_LOW: f64 = 20.0;
const THETA: f64 = 0.7;
const COVERAGE_KAPPA: f64 = 0.5;

/// Probability of introducing a new item this turn.
pub fn new_item_probability(debt: usize, coverage: f64, target_new_share: f64) -> f64 {
    let backlog = THETA * ((BACKLOG_LOW - debt as f64) / BACKLOG_LOW).clamp(0.0, 1.0);
    let gap = COVERAGE_KAPPA * (target_new_share - coverage).clamp(0.0, 1.0);
    let p = backlog + gap;
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Bernoulli draw against `p_new`.
pub fn should_admit<R: Rng>(p_new: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < p_new
}

/// Uniformly pick one of the introducible ids.
pub fn pick_new<'a, R: Rng>(candidates: &'a [String], rng: &mut R) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())].as_str())
}
