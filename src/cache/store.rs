use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;

/// One memoized access (or an explicit "none found" placeholder) within a
/// whole-Julian-day bucket. Unique on `(bucket_hash, bucket_index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAccessRow {
    pub bucket_hash: String,
    pub bucket_index: u32,
    pub satellite: String,
    pub groundstation: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub max_alt: Option<f64>,
    pub modified: DateTime<Utc>,
    /// True means the bucket was computed and holds no access, as opposed
    /// to "not yet computed" (no row at all).
    pub placeholder: bool,
}

impl CachedAccessRow {
    pub fn placeholder(bucket_hash: String, satellite: String, groundstation: String) -> Self {
        CachedAccessRow {
            bucket_hash,
            bucket_index: 0,
            satellite,
            groundstation,
            start_time: None,
            end_time: None,
            max_alt: None,
            modified: Utc::now(),
            placeholder: true,
        }
    }
}

/// Persistence collaborator for cache rows. Upserts must be idempotent on
/// the `(bucket_hash, bucket_index)` key: the miss-compute-store path is
/// deliberately not mutually exclusive, so concurrent writers may store the
/// same row twice.
pub trait AccessCacheStore: Send + Sync {
    fn upsert(&self, row: CachedAccessRow) -> Result<()>;

    /// All rows for a bucket, ascending by bucket index.
    fn fetch(&self, bucket_hash: &str) -> Result<Vec<CachedAccessRow>>;

    /// Drop every row referencing the satellite; called when its elements
    /// change.
    fn invalidate_satellite(&self, hwid: &str) -> Result<usize>;

    /// Drop every row referencing the groundstation; called when its
    /// position or mask changes.
    fn invalidate_groundstation(&self, hwid: &str) -> Result<usize>;

    /// Drop rows not modified since `modified_before`, any bucket. Cache
    /// rows are recomputable, so eviction is always safe.
    fn sweep(&self, modified_before: DateTime<Utc>) -> Result<usize>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryAccessCache {
    rows: RwLock<HashMap<(String, u32), CachedAccessRow>>,
}

impl MemoryAccessCache {
    pub fn new() -> Self {
        MemoryAccessCache::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl AccessCacheStore for MemoryAccessCache {
    fn upsert(&self, row: CachedAccessRow) -> Result<()> {
        let key = (row.bucket_hash.clone(), row.bucket_index);
        self.rows.write().insert(key, row);
        Ok(())
    }

    fn fetch(&self, bucket_hash: &str) -> Result<Vec<CachedAccessRow>> {
        let rows = self.rows.read();
        let mut found: Vec<CachedAccessRow> = rows
            .values()
            .filter(|r| r.bucket_hash == bucket_hash)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.bucket_index);
        Ok(found)
    }

    fn invalidate_satellite(&self, hwid: &str) -> Result<usize> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, r| r.satellite != hwid);
        Ok(before - rows.len())
    }

    fn invalidate_groundstation(&self, hwid: &str) -> Result<usize> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, r| r.groundstation != hwid);
        Ok(before - rows.len())
    }

    fn sweep(&self, modified_before: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, r| r.modified >= modified_before);
        Ok(before - rows.len())
    }
}
