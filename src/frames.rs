//! Frame Scheduler - retention model applied to verb frames
//!
//! A verb frame is drilled as a five-step card. Each step asks one slot
//! (lemma, case ending, preterite, ...); first-try hits make up a 0-5 score
//! which feeds a single stability update for the whole frame.
//!
//! Score mapping:
//! - Full (≥ 4): success gradient, counts as a hit
//! - Partial (= 3): miss gradient, still counts as a hit for q and streak
//! - Miss (< 3): miss gradient, resets the streak
//!
//! Parameters:
//! - η = 0.36 (learning rate)
//! - λ = 0.2 (miss penalty)
//! - max interval = 60 days
//! - S0 = 0.5, q0 = 0.5

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::retention::{
    due_date, elapsed_days, max_stability, recall_probability, update_accuracy, update_stability,
    MIN_STABILITY, STABILITY_CEILING,
};
use crate::storage::FrameStore;

// ==================== Constants ====================

pub const FRAME_LEARNING_RATE: f64 = 0.36;
pub const FRAME_MISS_PENALTY: f64 = 0.2;
pub const FRAME_MAX_INTERVAL_DAYS: f64 = 60.0;
pub const FRAME_INITIAL_STABILITY: f64 = 0.5;
pub const FRAME_INITIAL_ACCURACY: f64 = 0.5;

/// Steps in one card
pub const CARD_STEPS: usize = 5;

/// Due candidates considered per requested frame
const DUE_OVERSAMPLE: usize = 3;

/// Stored statistics for one verb frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub id: String,
    #[serde(default)]
    pub stability: f64,
    #[serde(default)]
    pub last_seen: i64,
    #[serde(default)]
    pub due: i64,
    #[serde(default = "default_frame_accuracy")]
    pub q: f64,
    #[serde(default)]
    pub streak: u32,
}

fn default_frame_accuracy() -> f64 {
    FRAME_INITIAL_ACCURACY
}

impl FrameStats {
    pub fn new(id: impl Into<String>, now: i64) -> Self {
        Self {
            id: id.into(),
            stability: FRAME_INITIAL_STABILITY,
            last_seen: now,
            due: now,
            q: FRAME_INITIAL_ACCURACY,
            streak: 0,
        }
    }

    /// Repair invalid numeric fields in place. Returns true if anything changed.
    pub fn normalize(&mut self, now: i64) -> bool {
        let mut repaired = false;
        if !(self.stability > 0.0 && self.stability.is_finite()) {
            self.stability = FRAME_INITIAL_STABILITY;
            repaired = true;
        } else if self.stability < MIN_STABILITY {
            self.stability = MIN_STABILITY;
            repaired = true;
        } else if self.stability > STABILITY_CEILING {
            self.stability = STABILITY_CEILING;
            repaired = true;
        }
        if self.last_seen <= 0 {
            self.last_seen = now;
            repaired = true;
        }
        if self.due <= 0 {
            self.due = now;
            repaired = true;
        }
        if !self.q.is_finite() {
            self.q = FRAME_INITIAL_ACCURACY;
            repaired = true;
        } else if !(0.0..=1.0).contains(&self.q) {
            self.q = self.q.clamp(0.0, 1.0);
            repaired = true;
        }
        repaired
    }
}

/// Graded outcome of one card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameReward {
    Full,
    Partial,
    Miss,
}

impl FrameReward {
    /// Map a 0-5 card score; out-of-range scores are clamped.
    pub fn from_score(score: u8) -> Self {
        match score.min(CARD_STEPS as u8) {
            4..=5 => FrameReward::Full,
            3 => FrameReward::Partial,
            _ => FrameReward::Miss,
        }
    }

    pub fn is_hit(self) -> bool {
        !matches!(self, FrameReward::Miss)
    }
}

/// Question slot of a card step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Slot {
    Lemma,
    CaseEnding,
    Praet,
    Part2Aux,
    Collocation,
    Syntax,
    Audio,
}

impl Slot {
    /// Rotation order; Syntax and Audio come after the core sequence.
    pub const ORDER: [Slot; 7] = [
        Slot::Lemma,
        Slot::CaseEnding,
        Slot::Praet,
        Slot::Part2Aux,
        Slot::Collocation,
        Slot::Syntax,
        Slot::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Lemma => "LEMMA",
            Slot::CaseEnding => "CASE_ENDING",
            Slot::Praet => "PRAET",
            Slot::Part2Aux => "PART2_AUX",
            Slot::Collocation => "COLLOCATION",
            Slot::Syntax => "SYNTAX",
            Slot::Audio => "AUDIO",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot to ask at `step`, rotating through the slots the frame has data for.
pub fn pick_slot(available: &[Slot], step: usize) -> Slot {
    let ordered: Vec<Slot> = Slot::ORDER
        .iter()
        .copied()
        .filter(|slot| available.contains(slot))
        .collect();
    if ordered.is_empty() {
        return Slot::Lemma;
    }
    ordered[step % ordered.len()]
}

pub struct FrameScheduler<S: FrameStore> {
    store: Arc<S>,
    max_interval_days: f64,
}

impl<S: FrameStore> FrameScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_interval_days: FRAME_MAX_INTERVAL_DAYS,
        }
    }

    pub fn with_max_interval(mut self, days: f64) -> Self {
        if days.is_finite() && days > 0.0 {
            self.max_interval_days = days;
        }
        self
    }

    async fn frame_stats(&self, frame_id: &str, now: i64) -> EngineResult<FrameStats> {
        let mut stats = match self.store.get_frame_stats(frame_id).await? {
            Some(stats) => stats,
            None => self.store.ensure_frame_stats(frame_id, now).await?,
        };
        if stats.normalize(now) {
            tracing::warn!(frame_id = %frame_id, "repaired invalid frame stats");
        }
        Ok(stats)
    }

    /// Apply a finished card's score to the frame and persist it.
    pub async fn record_card(&self, frame_id: &str, score: u8, now: i64) -> EngineResult<FrameStats> {
        let mut stats = self.frame_stats(frame_id, now).await?;
        let reward = FrameReward::from_score(score);

        let recall = recall_probability(elapsed_days(stats.last_seen, now), stats.stability);
        stats.stability = update_stability(
            stats.stability,
            reward == FrameReward::Full,
            recall,
            FRAME_LEARNING_RATE,
            FRAME_MISS_PENALTY,
            max_stability(self.max_interval_days),
        );
        stats.last_seen = now;
        stats.due = due_date(now, stats.stability);
        stats.q = update_accuracy(stats.q, if reward.is_hit() { 1.0 } else { 0.0 });
        stats.streak = if reward.is_hit() { stats.streak.saturating_add(1) } else { 0 };

        self.store.put_frame_stats(&stats).await?;
        tracing::debug!(
            frame_id = %frame_id,
            score,
            reward = ?reward,
            stability = stats.stability,
            "frame card recorded"
        );
        Ok(stats)
    }

    /// Up to `limit` frame ids: due frames first (earliest due first), then the
    /// rest in listing order.
    pub async fn pick_next_frames(&self, limit: usize, now: i64) -> EngineResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self.store.list_frame_ids().await?;
        let mut all = Vec::with_capacity(ids.len());
        for id in &ids {
            all.push(self.frame_stats(id, now).await?);
        }

        let mut due: Vec<&FrameStats> = all.iter().filter(|s| s.due <= now).collect();
        due.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.id.cmp(&b.id)));
        due.truncate(limit.saturating_mul(DUE_OVERSAMPLE));

        let mut out = Vec::with_capacity(limit);
        let mut used = HashSet::new();
        for stats in due {
            if out.len() >= limit {
                break;
            }
            if used.insert(stats.id.as_str()) {
                out.push(stats.id.clone());
            }
        }
        for id in &ids {
            if out.len() >= limit {
                break;
            }
            if used.insert(id.as_str()) {
                out.push(id.clone());
            }
        }
        Ok(out)
    }
}

/// One five-step card over a single frame.
///
/// Only first-try answers score; a retry after a hint is practice.
#[derive(Debug, Clone)]
pub struct CardRun {
    frame_id: String,
    available: Vec<Slot>,
    step: usize,
    score: u8,
}

impl CardRun {
    pub fn new(frame_id: impl Into<String>, available: Vec<Slot>) -> Self {
        Self {
            frame_id: frame_id.into(),
            available,
            step: 0,
            score: 0,
        }
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn is_complete(&self) -> bool {
        self.step >= CARD_STEPS
    }

    /// Slot for the current step, `None` once the card is complete.
    pub fn slot(&self) -> Option<Slot> {
        if self.is_complete() {
            return None;
        }
        Some(pick_slot(&self.available, self.step))
    }

    /// Record the first-try outcome of the current step and advance.
    /// Returns the next slot, if any.
    pub fn record(&mut self, first_try: bool) -> Option<Slot> {
        if self.is_complete() {
            return None;
        }
        if first_try {
            self.score += 1;
        }
        self.step += 1;
        self.slot()
    }

    /// Hand the score to the scheduler.
    pub async fn finish<S: FrameStore>(
        self,
        scheduler: &FrameScheduler<S>,
        now: i64,
    ) -> EngineResult<FrameStats> {
        scheduler.record_card(&self.frame_id, self.score, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::DAY_MS;
    use crate::storage::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_reward_mapping() {
        assert_eq!(FrameReward::from_score(5), FrameReward::Full);
        assert_eq!(FrameReward::from_score(4), FrameReward::Full);
        assert_eq!(FrameReward::from_score(3), FrameReward::Partial);
        assert_eq!(FrameReward::from_score(2), FrameReward::Miss);
        assert_eq!(FrameReward::from_score(0), FrameReward::Miss);
        assert_eq!(FrameReward::from_score(200), FrameReward::Full);
    }

    #[test]
    fn test_normalize_caps_huge_stability() {
        let mut stats = FrameStats::new("f1", NOW);
        stats.stability = 1e300;
        stats.due = 0;
        assert!(stats.normalize(NOW));
        assert_eq!(stats.stability, STABILITY_CEILING);
        assert_eq!(stats.due, NOW);
    }

    #[test]
    fn test_pick_slot_rotation() {
        let available = [Slot::Audio, Slot::Praet, Slot::Lemma];
        assert_eq!(pick_slot(&available, 0), Slot::Lemma);
        assert_eq!(pick_slot(&available, 1), Slot::Praet);
        assert_eq!(pick_slot(&available, 2), Slot::Audio);
        assert_eq!(pick_slot(&available, 3), Slot::Lemma);
    }

    #[test]
    fn test_pick_slot_fallback() {
        assert_eq!(pick_slot(&[], 4), Slot::Lemma);
    }

    #[test]
    fn test_card_run_counts_first_try_hits() {
        let mut run = CardRun::new("f1", vec![Slot::Lemma, Slot::CaseEnding]);
        assert_eq!(run.slot(), Some(Slot::Lemma));
        assert_eq!(run.record(true), Some(Slot::CaseEnding));
        run.record(false);
        run.record(true);
        run.record(true);
        assert_eq!(run.record(false), None);
        assert!(run.is_complete());
        assert_eq!(run.score(), 3);
        assert_eq!(run.record(true), None);
        assert_eq!(run.score(), 3);
    }

    #[tokio::test]
    async fn test_full_score_grows_stability() {
        let store = Arc::new(MemoryStore::new());
        store.add_frames(["f1"]).await;
        let scheduler = FrameScheduler::new(store.clone());
        store.ensure_frame_stats("f1", NOW).await.unwrap();

        let later = NOW + DAY_MS as i64;
        let stats = scheduler.record_card("f1", 5, later).await.unwrap();
        assert!(stats.stability > FRAME_INITIAL_STABILITY);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.last_seen, later);
        assert!(stats.due > later);
    }

    #[tokio::test]
    async fn test_partial_shrinks_stability_but_keeps_streak() {
        let store = Arc::new(MemoryStore::new());
        store.add_frames(["f1"]).await;
        let scheduler = FrameScheduler::new(store.clone());

        let stats = scheduler.record_card("f1", 3, NOW).await.unwrap();
        assert!(stats.stability < FRAME_INITIAL_STABILITY);
        assert_eq!(stats.streak, 1);
        assert!(stats.q > FRAME_INITIAL_ACCURACY);

        let stats = scheduler.record_card("f1", 1, NOW + 60_000).await.unwrap();
        assert_eq!(stats.streak, 0);
    }

    #[tokio::test]
    async fn test_pick_next_frames_due_first() {
        let store = Arc::new(MemoryStore::new());
        store.add_frames(["a", "b", "c", "d"]).await;
        let scheduler = FrameScheduler::new(store.clone());

        // All start due at NOW; push "a" and "b" into the future.
        scheduler.pick_next_frames(1, NOW).await.unwrap();
        scheduler.record_card("a", 5, NOW).await.unwrap();
        scheduler.record_card("b", 5, NOW).await.unwrap();
        let mut d = store.get_frame_stats("d").await.unwrap().unwrap();
        d.due = NOW - 10_000;
        store.put_frame_stats(&d).await.unwrap();

        let picked = scheduler.pick_next_frames(3, NOW + 1).await.unwrap();
        assert_eq!(picked, vec!["d".to_string(), "c".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_finish_records_score() {
        let store = Arc::new(MemoryStore::new());
        store.add_frames(["f1"]).await;
        let scheduler = FrameScheduler::new(store.clone());
        let mut run = CardRun::new("f1", vec![Slot::Lemma]);
        for _ in 0..CARD_STEPS {
            run.record(true);
        }
        let stats = run.finish(&scheduler, NOW).await.unwrap();
        assert_eq!(stats.streak, 1);
        assert_eq!(store.get_frame_stats("f1").await.unwrap(), Some(stats));
    }
}
