//! Candidate Collector & Priority Scorer
//!
//! Each turn the collector reads a snapshot of all item stats and partitions
//! the introduced items by their stage mode:
//! - due: `due ≤ now`
//! - nearly due: τ < p ≤ τ + δ
//!
//! Priority: π = max(0, τ - p) + α·(1 - q) + β·overdueRatio, where
//! overdueRatio = max(0, now - due) / interval length of the item itself.
//!
//! Selection is softmax-weighted over exp(κ·π), never argmax, so one item is
//! not hammered and equal priorities keep equal, non-zero chances.
//!
//! Parameters:
//! - α = 0.5 (weak-accuracy weight)
//! - β = 0.3 (lateness weight)
//! - κ = 6.0 (softmax greediness)
//! - hot pool = 30 items

use rand::Rng;
use std::cmp::Ordering;

use crate::retention::{
    elapsed_days, interval_ms, recall_probability, NEARLY_DUE_BAND, TARGET_RECALL,
};
use crate::storage::{StatsStore, StorageResult};
use crate::types::{ItemStats, ModeState};

const ALPHA: f64 = 0.5;
const BETA: f64 = 0.3;
pub const SOFTMAX_KAPPA: f64 = 6.0;
pub const HOT_POOL_SIZE: usize = 30;

/// Priority and the recall probability it was computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Priority {
    pub pi: f64,
    pub recall: f64,
}

/// One turn's partition of the library
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub due: Vec<ItemStats>,
    pub nearly: Vec<ItemStats>,
    /// Every introduced item, due or not
    pub introduced: Vec<ItemStats>,
    pub total_items: usize,
}

impl CandidateSet {
    /// Number of items due or nearly due.
    pub fn debt(&self) -> usize {
        self.due.len() + self.nearly.len()
    }

    pub fn total_introduced(&self) -> usize {
        self.introduced.len()
    }

    /// Fraction of the library ever introduced; 0 for an empty library.
    pub fn coverage(&self) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            self.introduced.len() as f64 / self.total_items as f64
        }
    }
}

/// Score one mode state at `now`.
pub fn priority(state: &ModeState, now: i64) -> Priority {
    let recall = recall_probability(elapsed_days(state.last_seen, now), state.stability);
    let interval = interval_ms(state.stability);
    let overdue_ratio = if interval > 0.0 {
        ((now - state.due) as f64 / interval).max(0.0)
    } else {
        0.0
    };
    let pi = (TARGET_RECALL - recall).max(0.0) + ALPHA * (1.0 - state.q) + BETA * overdue_ratio;
    Priority { pi, recall }
}

/// Partition already-normalized stats into due / nearly-due pools.
pub fn partition(stats: Vec<ItemStats>, total_items: usize, now: i64) -> CandidateSet {
    let mut set = CandidateSet {
        total_items,
        ..Default::default()
    };
    for st in stats.into_iter().filter(|s| s.introduced) {
        let active = st.active();
        let recall = recall_probability(elapsed_days(active.last_seen, now), active.stability);
        if active.due <= now {
            set.due.push(st.clone());
        } else if recall > TARGET_RECALL && recall <= TARGET_RECALL + NEARLY_DUE_BAND {
            set.nearly.push(st.clone());
        }
        set.introduced.push(st);
    }
    set
}

/// Read a snapshot of the library and partition it.
///
/// Items without a stored record count towards the library size but are not
/// introduced. Records that need repair are fixed in memory and written back
/// opportunistically; a failed write-back is logged and ignored.
pub async fn collect_candidates<S>(store: &S, now: i64) -> StorageResult<CandidateSet>
where
    S: StatsStore + ?Sized,
{
    let ids = store.list_ids().await?;
    let mut stats = Vec::with_capacity(ids.len());
    for id in &ids {
        let Some(mut st) = store.get_stats(id).await? else {
            continue;
        };
        if st.normalize(now) {
            tracing::warn!(item_id = %id, "repaired invalid stats record");
            if let Err(err) = store.put_stats(&st).await {
                tracing::warn!(error = %err, item_id = %id, "failed to persist repaired stats");
            }
        }
        stats.push(st);
    }
    Ok(partition(stats, ids.len(), now))
}

/// Draw an index with probability proportional to exp(κ·π).
///
/// Weights are taken relative to the largest priority so large π never
/// overflows.
pub fn softmax_sample<R: Rng>(priorities: &[f64], rng: &mut R) -> Option<usize> {
    if priorities.is_empty() {
        return None;
    }
    let max_pi = priorities
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max_pi.is_finite() {
        return Some(rng.gen_range(0..priorities.len()));
    }

    let weights: Vec<f64> = priorities
        .iter()
        .map(|p| {
            if p.is_finite() {
                (SOFTMAX_KAPPA * (p - max_pi)).exp()
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    // Zero-weight entries are never returned, even when the draw is exactly 0.
    let mut r = rng.gen::<f64>() * total;
    let mut last_live = None;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        if r < *w {
            return Some(i);
        }
        r -= w;
        last_live = Some(i);
    }
    last_live
}

/// Softmax-pick one item from a pool, scoring each by its stage mode.
pub fn pick_by_softmax<'a, R: Rng>(
    pool: &[&'a ItemStats],
    now: i64,
    rng: &mut R,
) -> Option<&'a ItemStats> {
    let priorities: Vec<f64> = pool.iter().map(|st| priority(st.active(), now).pi).collect();
    softmax_sample(&priorities, rng).map(|idx| pool[idx])
}

/// Top `HOT_POOL_SIZE` introduced items by priority, ties broken by id.
pub fn hot_pool(introduced: &[ItemStats], now: i64) -> Vec<&ItemStats> {
    let mut ranked: Vec<(&ItemStats, f64)> = introduced
        .iter()
        .map(|st| (st, priority(st.active(), now).pi))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    ranked.truncate(HOT_POOL_SIZE);
    ranked.into_iter().map(|(st, _)| st).collect()
}
