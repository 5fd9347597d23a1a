use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use log::debug;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::schedule::pass::Pass;
use crate::schedule::store::PassStore;

/// Minimum gap required before an active pass on the same resource,
/// seconds; covers antenna reset time.
pub const DEFAULT_GUARD_TIME_S: i64 = 90;

/// Serializes the overlap check and the write for pass commits. The check
/// and the write run inside one critical section keyed by the affected
/// satellite and groundstation, so two conflicting passes can never both
/// pass validation concurrently. Stale passes skip checking entirely.
pub struct PassConflictGuard<'a, S> {
    store: &'a S,
    guard_time: Duration,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<'a, S: PassStore> PassConflictGuard<'a, S> {
    pub fn new(store: &'a S, guard_time: Duration) -> Self {
        PassConflictGuard {
            store,
            guard_time,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_guard_time(store: &'a S) -> Self {
        PassConflictGuard::new(store, Duration::seconds(DEFAULT_GUARD_TIME_S))
    }

    /// Check the candidate against every other active pass sharing its
    /// satellite or groundstation, then write. Fails with
    /// [`Error::Conflict`] carrying the full conflicting set.
    pub fn commit(&self, pass: Pass) -> Result<Pass> {
        if pass.is_stale() {
            // stale passes may freely overlap
            return self.store.upsert(pass);
        }

        let result = {
            let handles = self.lock_handles(&pass);
            let _held: Vec<_> = handles.iter().map(|m| m.lock()).collect();

            let overlap_start = pass.start_time - self.guard_time;
            let overlap_end = pass.end_time;
            let conflicts: Vec<Pass> = self
                .store
                .overlapping(&pass.satellite, &pass.groundstation, overlap_start, overlap_end)?
                .into_iter()
                .filter(|other| other.uuid != pass.uuid)
                .collect();

            if !conflicts.is_empty() {
                debug!(
                    "pass {} conflicts with {} committed pass(es)",
                    pass.uuid,
                    conflicts.len()
                );
                Err(Error::Conflict { conflicts })
            } else {
                self.store.upsert(pass)
            }
        };

        self.prune_locks();
        result
    }

    /// Mutex handles for both affected resources, in sorted key order so
    /// concurrent commits cannot deadlock.
    fn lock_handles(&self, pass: &Pass) -> Vec<Arc<Mutex<()>>> {
        let mut keys = [
            format!("sat:{}", pass.satellite),
            format!("gs:{}", pass.groundstation),
        ];
        keys.sort();

        let mut locks = self.locks.lock();
        keys.iter()
            .map(|key| Arc::clone(locks.entry(key.clone()).or_default()))
            .collect()
    }

    /// Drop map entries no concurrent commit still references, keeping the
    /// map bounded by the number of in-flight commits rather than every
    /// hwid ever seen.
    fn prune_locks(&self) {
        self.locks
            .lock()
            .retain(|_, arc| Arc::strong_count(arc) > 1);
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}
