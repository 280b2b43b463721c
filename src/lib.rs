//! # lexi-engine - adaptive spaced-repetition card engine
//!
//! Decides which learnable item to present next and revises a per-skill
//! memory estimate after every answer:
//!
//! - **Retention model** - continuous-time forgetting curve, log-space stability updates
//! - **Stage machine** - Recognition → Chunking → Composing with virtual Leitner boxes
//! - **Collector** - due / nearly-due partitioning, priority scoring, softmax sampling
//! - **Admission** - probabilistic introduction of unseen items
//! - **Quick retry** - short-delay re-presentation of misses
//! - **Frames** - the same model applied to five-step verb frame cards
//!
//! Persistence is a collaborator behind the async [`storage::StatsStore`] and
//! [`storage::FrameStore`] traits; [`storage::MemoryStore`] backs tests and the
//! `lexi-sim` simulator.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lexi_engine::{CardEngine, MemoryStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lexi_engine::EngineError> {
//! let store = Arc::new(MemoryStore::new());
//! store.add_items(["der Hund", "die Katze"]).await;
//!
//! let mut engine = CardEngine::with_seed(store, 42);
//! let now = 1_700_000_000_000;
//! let next = engine.sample_next(now).await?;
//! engine.on_review(&next.item_id, next.mode, true, now + 5_000).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod admission;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod frames;
pub mod logging;
pub mod quick_retry;
pub mod retention;
pub mod settings;
pub mod stage;
pub mod storage;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use engine::CardEngine;
pub use error::{EngineError, EngineResult};
pub use frames::{pick_slot, CardRun, FrameReward, FrameScheduler, FrameStats, Slot};
pub use quick_retry::{QuickRetryEntry, QuickRetryQueue};
pub use settings::{PromotionRule, PromotionRulePatch, ScheduleSettings, SettingsPatch};
pub use storage::{FrameStore, MemoryStore, StatsStore, StorageError, StorageResult};
pub use types::{ItemStats, Mode, ModeState, Presentation, Progress};
