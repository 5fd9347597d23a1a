use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::cache::store::{AccessCacheStore, CachedAccessRow};
use crate::error::Result;
use crate::model::{GroundStation, Satellite};
use crate::predict::{Access, AccessFinder};
use crate::time::TimeScale;

pub const DEFAULT_LIMIT: usize = 100;

/// Stable content fingerprint over the orbital and ground inputs: matching
/// fingerprints mean matching accesses. Geodetic fields are rounded to six
/// decimals and mask entries to two, matching their stored precision.
pub fn fingerprint(satellite: &Satellite, station: &GroundStation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(satellite.tle.line1());
    hasher.update("|");
    hasher.update(satellite.tle.line2());
    hasher.update("|");
    hasher.update(format!(
        "{:.6}|{:.6}|{:.6}",
        station.latitude, station.longitude, station.elevation_m
    ));
    for cutoff in station.horizon_mask.values() {
        hasher.update(format!("|{cutoff:.2}"));
    }
    hex::encode(hasher.finalize())
}

fn bucket_hash(fingerprint: &str, bucket: i64) -> String {
    format!("{fingerprint}@{bucket}")
}

/// Which edges of a time range admit partially-overlapping windows. Useful
/// for pagination: a pager walking forward sets `End` so the window that
/// straddled the previous page's end is not returned twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeInclusive {
    #[default]
    Both,
    Start,
    End,
    Neither,
}

/// Keep the windows admitted by the `inclusive` criteria over
/// `[start, end]`.
pub fn filter_range(
    accesses: Vec<Access>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    inclusive: RangeInclusive,
) -> Vec<Access> {
    accesses
        .into_iter()
        .filter(|a| match inclusive {
            RangeInclusive::End | RangeInclusive::Neither => a.start_time() >= start,
            _ => a.end_time() >= start,
        })
        .filter(|a| match inclusive {
            RangeInclusive::Start | RangeInclusive::Neither => a.end_time() <= end,
            _ => a.start_time() <= end,
        })
        .collect()
}

/// Day-bucketed memoization in front of [`AccessFinder`]. Misses compute
/// exactly one whole Julian day and upsert the results; concurrent misses
/// waste cycles but cannot corrupt state.
pub struct CachedAccessCalculator<'a, S> {
    store: &'a S,
    finder: AccessFinder,
    timescale: &'a TimeScale,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<'a, S: AccessCacheStore> CachedAccessCalculator<'a, S> {
    pub fn new(store: &'a S, timescale: &'a TimeScale) -> Self {
        CachedAccessCalculator {
            store,
            finder: AccessFinder::new(),
            timescale,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Buckets served from the store since construction.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Buckets computed since construction.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// All accesses between the given satellites and groundstations over
    /// the range, ascending by start time. A missing range defaults to
    /// "now" until two days from now. Stops filling once `limit` is
    /// reached.
    pub fn accesses(
        &self,
        satellites: &[Satellite],
        stations: &[GroundStation],
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Access>> {
        let (start, end) = self.timescale.default_range(range_start, range_end);

        let bucket_start = self.timescale.julian_day(start).floor() as i64;
        let bucket_end = self.timescale.julian_day(end).ceil() as i64;

        let mut accesses = Vec::new();
        for bucket in bucket_start..bucket_end {
            for satellite in satellites {
                for station in stations {
                    let found = self.pair_bucket(satellite, station, bucket)?;
                    accesses.extend(
                        found
                            .into_iter()
                            .filter(|a| a.end_time() >= start && a.start_time() <= end),
                    );
                }
            }
            if accesses.len() > limit {
                break;
            }
        }

        accesses.sort_by_key(|a| a.start_time());
        accesses.truncate(limit);
        Ok(accesses)
    }

    /// Accesses for one (satellite, groundstation) pair on one Julian day,
    /// computed on miss and memoized. Placeholder rows are stored for empty
    /// days and never returned.
    fn pair_bucket(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        bucket: i64,
    ) -> Result<Vec<Access>> {
        let hash = bucket_hash(&fingerprint(satellite, station), bucket);

        let mut rows = self.store.fetch(&hash)?;
        if rows.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            let (bucket_start, bucket_end) = self.timescale.bucket_range(bucket);
            let found = self.finder.find(satellite, station, bucket_start, bucket_end)?;

            // only windows rising inside this bucket belong to it; the rest
            // are owned by the neighboring day
            let owned: Vec<&Access> = found
                .iter()
                .filter(|a| a.start_time() >= bucket_start && a.start_time() < bucket_end)
                .collect();

            if owned.is_empty() {
                self.store.upsert(CachedAccessRow::placeholder(
                    hash.clone(),
                    satellite.hwid.clone(),
                    station.hwid.clone(),
                ))?;
            }
            for (index, access) in owned.iter().enumerate() {
                self.store.upsert(CachedAccessRow {
                    bucket_hash: hash.clone(),
                    bucket_index: index as u32,
                    satellite: satellite.hwid.clone(),
                    groundstation: station.hwid.clone(),
                    start_time: Some(access.start_time()),
                    end_time: Some(access.end_time()),
                    max_alt: Some(access.max_alt()),
                    modified: Utc::now(),
                    placeholder: false,
                })?;
            }
            debug!(
                "cached {} access(es) for ({}, {}) on julian day {}",
                owned.len(),
                satellite.hwid,
                station.hwid,
                bucket
            );
            rows = self.store.fetch(&hash)?;
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        let mut accesses = Vec::new();
        for row in rows.into_iter().filter(|r| !r.placeholder) {
            let (Some(start), Some(end), Some(max_alt)) =
                (row.start_time, row.end_time, row.max_alt)
            else {
                warn!("dropping malformed cache row {}#{}", row.bucket_hash, row.bucket_index);
                continue;
            };
            accesses.push(Access::new(
                satellite.clone(),
                station.clone(),
                start,
                end,
                max_alt,
            ));
        }
        Ok(accesses)
    }
}

/// Retention sweep: drop rows untouched for longer than `retention`. Safe
/// to run at any time, everything in the cache is recomputable.
pub fn sweep_cache<S: AccessCacheStore>(store: &S, retention: Duration) -> Result<usize> {
    let cutoff = Utc::now() - retention;
    let removed = store.sweep(cutoff)?;
    info!("removed {removed} cached access row(s) not modified since {cutoff}");
    Ok(removed)
}
