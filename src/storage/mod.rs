//! Storage seam
//!
//! The engine never owns persistence. It talks to a collaborator through two
//! async traits:
//! - `StatsStore` for learnable items (terms)
//! - `FrameStore` for verb frames
//!
//! Every call is assumed atomic on its own and returns `StorageResult<T>`; no
//! cross-call transactions are managed. At most one in-flight review per item
//! is assumed, so implementations need no per-item locking.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::frames::FrameStats;
use crate::types::ItemStats;

/// Storage collaborator failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// All item ids in the library.
    async fn list_ids(&self) -> StorageResult<Vec<String>>;

    /// Stored stats, `None` when the item has never been touched.
    async fn get_stats(&self, id: &str) -> StorageResult<Option<ItemStats>>;

    /// Stored stats, creating and storing defaults if absent. Idempotent.
    async fn ensure_stats(&self, id: &str, now: i64) -> StorageResult<ItemStats>;

    /// Full replace of one record.
    async fn put_stats(&self, stats: &ItemStats) -> StorageResult<()>;

    /// Ids with no stats or with `introduced == false`.
    async fn list_unintroduced_ids(&self) -> StorageResult<Vec<String>>;
}

#[async_trait]
pub trait FrameStore: Send + Sync {
    async fn list_frame_ids(&self) -> StorageResult<Vec<String>>;

    async fn get_frame_stats(&self, id: &str) -> StorageResult<Option<FrameStats>>;

    async fn ensure_frame_stats(&self, id: &str, now: i64) -> StorageResult<FrameStats>;

    async fn put_frame_stats(&self, stats: &FrameStats) -> StorageResult<()>;
}
