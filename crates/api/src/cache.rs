//! Read-through cache for image detail lookups.
//!
//! Entries expire after the configured TTL. Every write to the image table
//! clears the whole cache rather than tracking individual keys.
//!
//! Each clear bumps a generation counter. A loader captures the generation
//! before reading the database and stores its result with
//! [`DetailCache::insert_if_current`], so a record read before a concurrent
//! delete is never cached after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use imgocr_core::types::DbId;
use imgocr_db::models::image::ImageRecord;

/// Upper bound on cached records.
const MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
pub struct DetailCache {
    inner: Cache<DbId, ImageRecord>,
    generation: Arc<AtomicU64>,
}

impl DetailCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: &DbId) -> Option<ImageRecord> {
        self.inner.get(id)
    }

    /// Cache `record` only if no clear happened since `generation` was read.
    ///
    /// The entry is removed again when a clear lands between the insert and
    /// the re-check. Returns whether the record stayed cached.
    pub fn insert_if_current(&self, record: ImageRecord, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        let id = record.id;
        self.inner.insert(id, record);
        if self.generation() != generation {
            self.inner.invalidate(&id);
            return false;
        }
        true
    }

    /// Drop every cached record.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_all();
        tracing::debug!("Image detail cache cleared");
    }
}
