//! lexi-sim: drives the card engine against a simulated learner.
//!
//! The learner keeps a hidden stability per (item, mode) and answers with the
//! probability its own forgetting curve predicts, so engine decisions can be
//! watched end to end without a UI.

use std::collections::HashMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use lexi_engine::config::SimConfig;
use lexi_engine::logging::init_tracing;
use lexi_engine::retention::{recall_probability, DAY_MS};
use lexi_engine::{CardEngine, CardRun, EngineError, FrameScheduler, MemoryStore, Mode, Slot};

const LEARNER_INITIAL_STABILITY: f64 = 0.3;
const LEARNER_GROWTH: f64 = 1.8;
const LEARNER_DECAY: f64 = 0.6;
const LEARNER_FRAME_ACCURACY: f64 = 0.75;
const REPORT_EVERY: usize = 50;
const FRAME_COUNT: usize = 12;
const FRAME_SESSION: usize = 5;

/// Hidden memory of the simulated learner
struct Learner {
    memory: HashMap<(String, Mode), (f64, i64)>,
    rng: ChaCha8Rng,
}

impl Learner {
    fn new(seed: u64) -> Self {
        Self {
            memory: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    fn answer(&mut self, item_id: &str, mode: Mode, now: i64) -> bool {
        let entry = self
            .memory
            .entry((item_id.to_string(), mode))
            .or_insert((LEARNER_INITIAL_STABILITY, now));
        let elapsed = (now - entry.1).max(0) as f64 / DAY_MS;
        let p = if entry.1 == now { 0.5 } else { recall_probability(elapsed, entry.0) };
        let success = self.rng.gen_bool(p.clamp(0.0, 1.0));
        entry.0 *= if success { LEARNER_GROWTH } else { LEARNER_DECAY };
        entry.1 = now;
        success
    }

    fn first_try(&mut self) -> bool {
        self.rng.gen_bool(LEARNER_FRAME_ACCURACY)
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = SimConfig::from_env();
    let _log_guard = init_tracing(&config);

    let settings = match config.schedule_settings() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "failed to load schedule settings");
            std::process::exit(1);
        }
    };

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(
        seed,
        items = config.items,
        turns = config.turns,
        turn_seconds = config.turn_seconds,
        "starting simulation"
    );

    let store = Arc::new(MemoryStore::new());
    store
        .add_items((0..config.items).map(|i| format!("item-{i:04}")))
        .await;
    store
        .add_frames((0..FRAME_COUNT).map(|i| format!("frame-{i:02}")))
        .await;

    let mut engine = CardEngine::with_seed(Arc::clone(&store), seed).with_settings(settings);
    let mut learner = Learner::new(seed);
    let mut now = chrono::Utc::now().timestamp_millis();
    let step_ms = config.turn_seconds * 1000;

    let mut correct = 0usize;
    let mut answered = 0usize;
    for turn in 1..=config.turns {
        now += step_ms;
        let next = match engine.sample_next(now).await {
            Ok(next) => next,
            Err(EngineError::NoData) => {
                tracing::warn!(turn, "nothing to present, stopping");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, turn, "sampling failed");
                std::process::exit(1);
            }
        };

        let success = learner.answer(&next.item_id, next.mode, now);
        answered += 1;
        if success {
            correct += 1;
        }
        if let Err(err) = engine.on_review(&next.item_id, next.mode, success, now).await {
            tracing::error!(error = %err, item_id = %next.item_id, "review failed");
            std::process::exit(1);
        }

        if turn % REPORT_EVERY == 0 {
            match engine.get_progress(now).await {
                Ok(progress) => tracing::info!(
                    turn,
                    coverage = progress.coverage,
                    debt = progress.debt,
                    nearly_debt = progress.nearly_debt,
                    introduced = progress.total_introduced,
                    pending_retries = engine.pending_retries().len(),
                    "progress"
                ),
                Err(err) => tracing::warn!(error = %err, "progress unavailable"),
            }
        }
    }

    let accuracy = if answered == 0 { 0.0 } else { correct as f64 / answered as f64 };
    tracing::info!(answered, correct, accuracy, "term session finished");

    let scheduler = FrameScheduler::new(Arc::clone(&store));
    let frames = match scheduler.pick_next_frames(FRAME_SESSION, now).await {
        Ok(frames) => frames,
        Err(err) => {
            tracing::error!(error = %err, "frame selection failed");
            std::process::exit(1);
        }
    };
    let slots = [Slot::Lemma, Slot::CaseEnding, Slot::Praet, Slot::Part2Aux];
    for frame_id in frames {
        now += step_ms;
        let mut run = CardRun::new(frame_id, slots.to_vec());
        while run.slot().is_some() {
            run.record(learner.first_try());
        }
        let score = run.score();
        let frame_id = run.frame_id().to_string();
        match run.finish(&scheduler, now).await {
            Ok(stats) => tracing::info!(
                frame_id = %frame_id,
                score,
                stability = stats.stability,
                "frame card finished"
            ),
            Err(err) => tracing::warn!(error = %err, frame_id = %frame_id, "frame card not recorded"),
        }
    }
}
