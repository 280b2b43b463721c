//! In-memory store
//!
//! Backs the simulator and the tests. Ids keep insertion order so listings are
//! deterministic. `set_unavailable(true)` makes every call fail, which is how
//! callers exercise their recovery path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{FrameStore, StatsStore, StorageError, StorageResult};
use crate::frames::FrameStats;
use crate::types::ItemStats;

#[derive(Debug, Default)]
struct Inner {
    item_ids: Vec<String>,
    stats: HashMap<String, ItemStats>,
    frame_ids: Vec<String>,
    frames: HashMap<String, FrameStats>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register item ids in the library; duplicates are ignored.
    pub async fn add_items<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut inner = self.inner.write().await;
        for id in ids {
            let id = id.into();
            if !inner.item_ids.contains(&id) {
                inner.item_ids.push(id);
            }
        }
    }

    /// Register verb frame ids; duplicates are ignored.
    pub async fn add_frames<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut inner = self.inner.write().await;
        for id in ids {
            let id = id.into();
            if !inner.frame_ids.contains(&id) {
                inner.frame_ids.push(id);
            }
        }
    }

    /// Insert a raw record without validation, as a foreign writer might.
    pub async fn insert_raw(&self, stats: ItemStats) {
        let mut inner = self.inner.write().await;
        if !inner.item_ids.contains(&stats.id) {
            inner.item_ids.push(stats.id.clone());
        }
        inner.stats.insert(stats.id.clone(), stats);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn list_ids(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        Ok(self.inner.read().await.item_ids.clone())
    }

    async fn get_stats(&self, id: &str) -> StorageResult<Option<ItemStats>> {
        self.check()?;
        Ok(self.inner.read().await.stats.get(id).cloned())
    }

    async fn ensure_stats(&self, id: &str, now: i64) -> StorageResult<ItemStats> {
        self.check()?;
        let mut inner = self.inner.write().await;
        let stats = inner
            .stats
            .entry(id.to_string())
            .or_insert_with(|| ItemStats::new(id, now));
        Ok(stats.clone())
    }

    async fn put_stats(&self, stats: &ItemStats) -> StorageResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .stats
            .insert(stats.id.clone(), stats.clone());
        Ok(())
    }

    async fn list_unintroduced_ids(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .item_ids
            .iter()
            .filter(|id| !inner.stats.get(*id).map(|s| s.introduced).unwrap_or(false))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FrameStore for MemoryStore {
    async fn list_frame_ids(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        Ok(self.inner.read().await.frame_ids.clone())
    }

    async fn get_frame_stats(&self, id: &str) -> StorageResult<Option<FrameStats>> {
        self.check()?;
        Ok(self.inner.read().await.frames.get(id).cloned())
    }

    async fn ensure_frame_stats(&self, id: &str, now: i64) -> StorageResult<FrameStats> {
        self.check()?;
        let mut inner = self.inner.write().await;
        let stats = inner
            .frames
            .entry(id.to_string())
            .or_insert_with(|| FrameStats::new(id, now));
        Ok(stats.clone())
    }

    async fn put_frame_stats(&self, stats: &FrameStats) -> StorageResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .frames
            .insert(stats.id.clone(), stats.clone());
        Ok(())
    }
}
