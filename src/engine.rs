//! Card Engine - orchestration
//!
//! Ties the retention model, stage machine, collector, admission controller
//! and quick-retry queue into the two operations callers use:
//! - `sample_next(now)`: what to present next
//! - `on_review(item, mode, success, now)`: revise memory state after an answer
//!
//! Concurrency: the engine is driven by a single cooperative caller. Methods
//! that mutate take `&mut self`, and at most one in-flight review per item is
//! assumed; nothing here locks individual records.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use crate::admission::{new_item_probability, pick_new, should_admit};
use crate::collector::{collect_candidates, hot_pool, pick_by_softmax};
use crate::error::{EngineError, EngineResult};
use crate::quick_retry::QuickRetryQueue;
use crate::retention::{
    base_learning_rate, due_date, elapsed_days, learning_rate, max_stability, recall_probability,
    update_accuracy, update_stability, MISS_PENALTY,
};
use crate::settings::{ScheduleSettings, SettingsPatch};
use crate::stage::{maybe_demote, maybe_promote, presented_mode};
use crate::storage::StatsStore;
use crate::types::{ItemStats, Mode, Presentation, Progress};

pub struct CardEngine<S: StatsStore> {
    store: Arc<S>,
    settings: ScheduleSettings,
    quick_retry: QuickRetryQueue,
    rng: ChaCha8Rng,
}

impl<S: StatsStore> CardEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            settings: ScheduleSettings::default(),
            quick_retry: QuickRetryQueue::new(),
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Engine with a fixed RNG seed (for tests and simulation)
    pub fn with_seed(store: Arc<S>, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            ..Self::new(store)
        }
    }

    pub fn with_settings(mut self, settings: ScheduleSettings) -> Self {
        self.settings = settings.sanitized();
        self
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// Shallow-merge a partial settings update.
    pub fn configure(&mut self, patch: &SettingsPatch) {
        self.settings = self.settings.merged(patch);
        tracing::debug!(settings = ?self.settings, "schedule settings updated");
    }

    pub fn pending_retries(&self) -> &QuickRetryQueue {
        &self.quick_retry
    }

    /// Validated record for `item_id`, created with defaults if absent.
    ///
    /// Repairs are written back opportunistically; a failed write-back is
    /// logged, never returned.
    pub async fn stats(&self, item_id: &str, now: i64) -> EngineResult<ItemStats> {
        let mut stats = match self.store.get_stats(item_id).await? {
            Some(stats) => stats,
            None => self.store.ensure_stats(item_id, now).await?,
        };
        if stats.normalize(now) {
            tracing::warn!(item_id = %item_id, "repaired invalid stats record");
            if let Err(err) = self.store.put_stats(&stats).await {
                tracing::warn!(error = %err, item_id = %item_id, "failed to persist repaired stats");
            }
        }
        Ok(stats)
    }

    /// Mark an item as introduced and make its Recognition mode due now.
    pub async fn introduce(&self, item_id: &str, now: i64) -> EngineResult<ItemStats> {
        let mut stats = self.stats(item_id, now).await?;
        stats.introduced = true;
        stats.stage = Mode::Recognition;
        stats.recognition.last_seen = now;
        stats.recognition.due = now;
        self.store.put_stats(&stats).await?;
        tracing::info!(item_id = %item_id, "introduced new item");
        Ok(stats)
    }

    async fn admit_new(&mut self, now: i64) -> EngineResult<Option<Presentation>> {
        let candidates = self.store.list_unintroduced_ids().await?;
        let Some(item_id) = pick_new(&candidates, &mut self.rng).map(str::to_string) else {
            return Ok(None);
        };
        self.introduce(&item_id, now).await?;
        Ok(Some(Presentation::new(item_id, Mode::Recognition)))
    }

    /// Decide what to present next.
    ///
    /// Order: ready quick retry → probabilistic admission → due → nearly due →
    /// hot pool → forced admission → `EngineError::NoData`.
    pub async fn sample_next(&mut self, now: i64) -> EngineResult<Presentation> {
        if let Some(entry) = self.quick_retry.take_ready(now) {
            let mut stats = self.stats(&entry.item_id, now).await?;
            if !stats.introduced {
                stats.introduced = true;
                self.store.put_stats(&stats).await?;
            }
            tracing::debug!(item_id = %entry.item_id, mode = %entry.mode, "quick retry");
            return Ok(Presentation::new(entry.item_id, entry.mode));
        }

        let set = collect_candidates(self.store.as_ref(), now).await?;
        let p_new = new_item_probability(set.debt(), set.coverage(), self.settings.target_new_share);
        tracing::debug!(
            due = set.due.len(),
            nearly = set.nearly.len(),
            coverage = set.coverage(),
            p_new,
            "collected candidates"
        );

        if should_admit(p_new, &mut self.rng) {
            if let Some(presentation) = self.admit_new(now).await? {
                return Ok(presentation);
            }
        }

        let chosen = if !set.due.is_empty() {
            let pool: Vec<&ItemStats> = set.due.iter().collect();
            pick_by_softmax(&pool, now, &mut self.rng).cloned()
        } else if !set.nearly.is_empty() {
            let pool: Vec<&ItemStats> = set.nearly.iter().collect();
            pick_by_softmax(&pool, now, &mut self.rng).cloned()
        } else if !set.introduced.is_empty() {
            let pool = hot_pool(&set.introduced, now);
            pick_by_softmax(&pool, now, &mut self.rng).cloned()
        } else {
            None
        };

        match chosen {
            Some(stats) => {
                let mode = presented_mode(&stats);
                if mode != stats.stage {
                    tracing::debug!(
                        item_id = %stats.id,
                        stage = %stats.stage,
                        presented = %mode,
                        "weak stage, presenting lower mode"
                    );
                }
                Ok(Presentation::new(stats.id, mode))
            }
            None => match self.admit_new(now).await? {
                Some(presentation) => Ok(presentation),
                None => Err(EngineError::NoData),
            },
        }
    }

    /// Revise memory state after an answer and persist the full record.
    ///
    /// Success may promote the stage; a miss may demote it and schedules a
    /// quick retry. The retry is queued only once the record is stored.
    pub async fn on_review(
        &mut self,
        item_id: &str,
        mode: Mode,
        success: bool,
        now: i64,
    ) -> EngineResult<ItemStats> {
        let mut stats = self.stats(item_id, now).await?;
        let s_max = max_stability(self.settings.max_interval_days);

        let state = stats.mode_mut(mode);
        let recall = recall_probability(elapsed_days(state.last_seen, now), state.stability);
        let eta = learning_rate(base_learning_rate(mode), state.streak, success);
        let stability = update_stability(state.stability, success, recall, eta, MISS_PENALTY, s_max);

        state.stability = stability;
        state.last_seen = now;
        state.due = due_date(now, stability);
        state.q = update_accuracy(state.q, if success { 1.0 } else { 0.0 });
        state.streak = if success { state.streak.saturating_add(1) } else { 0 };
        state.n = state.n.saturating_add(1);

        tracing::debug!(
            item_id = %item_id,
            mode = %mode,
            success,
            recall,
            stability,
            "review applied"
        );

        if success {
            if let Some(stage) = maybe_promote(&mut stats, &self.settings, now) {
                tracing::info!(item_id = %item_id, stage = %stage, "promoted");
            }
        } else if let Some(stage) = maybe_demote(&mut stats, mode) {
            tracing::info!(item_id = %item_id, stage = %stage, "demoted");
        }

        self.store.put_stats(&stats).await?;

        if !success {
            self.quick_retry.enqueue(item_id, mode, now);
        }
        Ok(stats)
    }

    /// Read-only library snapshot.
    pub async fn get_progress(&self, now: i64) -> EngineResult<Progress> {
        let set = collect_candidates(self.store.as_ref(), now).await?;
        Ok(Progress {
            coverage: set.coverage(),
            debt: set.due.len(),
            nearly_debt: set.nearly.len(),
            total_introduced: set.total_introduced(),
            total_items: set.total_items,
        })
    }
}
