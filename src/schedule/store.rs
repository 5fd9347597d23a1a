use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schedule::pass::Pass;

/// Persistence collaborator for passes. Writes that must honor the overlap
/// invariant go through [`PassConflictGuard`](crate::schedule::PassConflictGuard),
/// never directly through `upsert`.
pub trait PassStore: Send + Sync {
    fn upsert(&self, pass: Pass) -> Result<Pass>;

    fn get(&self, uuid: Uuid) -> Result<Pass>;

    fn delete(&self, uuid: Uuid) -> Result<()>;

    fn all(&self) -> Result<Vec<Pass>>;

    /// Active passes referencing the same satellite **or** the same
    /// groundstation whose `[start, end]` intersects `[range_start,
    /// range_end]`. Includes a pass with the candidate's own uuid if
    /// present; the guard filters it out.
    fn overlapping(
        &self,
        satellite: &str,
        groundstation: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Pass>>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryPassStore {
    passes: RwLock<HashMap<Uuid, Pass>>,
}

impl MemoryPassStore {
    pub fn new() -> Self {
        MemoryPassStore::default()
    }

    pub fn len(&self) -> usize {
        self.passes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.read().is_empty()
    }
}

impl PassStore for MemoryPassStore {
    fn upsert(&self, pass: Pass) -> Result<Pass> {
        self.passes.write().insert(pass.uuid, pass.clone());
        Ok(pass)
    }

    fn get(&self, uuid: Uuid) -> Result<Pass> {
        self.passes
            .read()
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("pass {uuid}")))
    }

    fn delete(&self, uuid: Uuid) -> Result<()> {
        self.passes
            .write()
            .remove(&uuid)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("pass {uuid}")))
    }

    fn all(&self) -> Result<Vec<Pass>> {
        let mut passes: Vec<Pass> = self.passes.read().values().cloned().collect();
        passes.sort_by_key(|p| p.start_time);
        Ok(passes)
    }

    fn overlapping(
        &self,
        satellite: &str,
        groundstation: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Pass>> {
        let passes = self.passes.read();
        let mut found: Vec<Pass> = passes
            .values()
            .filter(|p| !p.is_stale())
            .filter(|p| p.satellite == satellite || p.groundstation == groundstation)
            .filter(|p| p.start_time <= range_end && p.end_time >= range_start)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.start_time);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroundStation, HorizonMask, Satellite, Tle};
    use chrono::{Duration, TimeZone};

    fn pass(sat: &str, gs: &str, start_min: i64, end_min: i64) -> Pass {
        let satellite = Satellite::new(
            sat,
            Tle::new(
                "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
                "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
            )
            .unwrap(),
        );
        let station = GroundStation::new(gs, 0.0, 0.0, 0.0, HorizonMask::uniform(5.0));
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Pass::from_times(
            &satellite,
            &station,
            t0 + Duration::minutes(start_min),
            t0 + Duration::minutes(end_min),
        )
    }

    #[test]
    fn get_and_delete_round_trip() {
        let store = MemoryPassStore::new();
        let p = store.upsert(pass("sat-a", "gs-1", 0, 10)).unwrap();
        assert_eq!(store.get(p.uuid).unwrap().uuid, p.uuid);
        store.delete(p.uuid).unwrap();
        assert!(matches!(store.get(p.uuid), Err(Error::NotFound(_))));
        assert!(matches!(store.delete(p.uuid), Err(Error::NotFound(_))));
    }

    #[test]
    fn overlapping_matches_either_resource() {
        let store = MemoryPassStore::new();
        store.upsert(pass("sat-a", "gs-1", 0, 10)).unwrap();
        store.upsert(pass("sat-b", "gs-1", 20, 30)).unwrap();
        store.upsert(pass("sat-a", "gs-2", 40, 50)).unwrap();
        store.upsert(pass("sat-c", "gs-3", 0, 50)).unwrap();

        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let found = store
            .overlapping("sat-a", "gs-1", t0, t0 + Duration::minutes(60))
            .unwrap();
        // sat-c/gs-3 shares neither resource
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn overlapping_requires_interval_intersection() {
        let store = MemoryPassStore::new();
        store.upsert(pass("sat-a", "gs-1", 0, 10)).unwrap();

        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let disjoint = store
            .overlapping("sat-a", "gs-1", t0 + Duration::minutes(11), t0 + Duration::minutes(20))
            .unwrap();
        assert!(disjoint.is_empty());

        // an enclosing range still intersects
        let enclosing = store
            .overlapping("sat-a", "gs-1", t0 - Duration::minutes(5), t0 + Duration::minutes(15))
            .unwrap();
        assert_eq!(enclosing.len(), 1);
    }

    #[test]
    fn overlapping_skips_stale_passes() {
        let store = MemoryPassStore::new();
        let mut stale = pass("sat-a", "gs-1", 0, 10);
        stale.is_desired = false;
        store.upsert(stale).unwrap();

        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let found = store
            .overlapping("sat-a", "gs-1", t0, t0 + Duration::minutes(60))
            .unwrap();
        assert!(found.is_empty());
    }
}
