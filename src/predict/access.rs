use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{GroundStation, HorizonMask, Satellite};
use crate::predict::propagation::OrbitalModel;
use crate::time::{add_seconds, TimeScale};
use crate::token::AccessIdCodec;

/// Initial boundary-search step, seconds. The sign selects the direction.
const BOUNDARY_STEP_S: f64 = 60.0;
/// Boundary search stops when the elevation is within this many degrees of
/// the horizon cutoff.
const BOUNDARY_SIGMA_DEG: f64 = 0.01;
/// Max-altitude search stops when the step has shrunk below this many
/// seconds.
const MAX_ALT_SIGMA_S: f64 = 0.1;
/// Hard ceiling for the adaptive searches; exceeding it is a defect, not an
/// imprecise answer.
const MAX_SEARCH_ITERATIONS: u32 = 1000;

/// A contiguous interval during which a satellite is above a ground
/// station's horizon mask. A value object: recomputed or fetched from cache
/// on demand, never persisted directly.
#[derive(Debug, Clone)]
pub struct Access {
    satellite: Satellite,
    groundstation: GroundStation,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    max_alt: f64,
}

/// Outward projection of an access, with its recomputable token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessProjection {
    pub id: String,
    pub satellite: String,
    pub groundstation: String,
    pub start_time: String,
    pub end_time: String,
    pub max_alt: f64,
}

impl Access {
    pub fn new(
        satellite: Satellite,
        groundstation: GroundStation,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_alt: f64,
    ) -> Self {
        debug_assert!(start_time < end_time);
        Access {
            satellite,
            groundstation,
            start_time,
            end_time,
            max_alt,
        }
    }

    /// Recover the full access containing `t`. Fails with `NotFound` unless
    /// `t` is strictly inside a visibility window.
    pub fn from_time(t: DateTime<Utc>, satellite: &Satellite, station: &GroundStation) -> Result<Self> {
        let model = OrbitalModel::new(satellite, station)?;
        let mask = &station.horizon_mask;

        let here = model.observe(t)?;
        if here.altitude_deg <= mask.cutoff(here.azimuth_deg) {
            return Err(Error::not_found(format!(
                "no access between {} and {} at {}",
                satellite.hwid,
                station.hwid,
                t.format("%Y-%m-%dT%H:%M:%SZ"),
            )));
        }

        let start_time = find_cutoff(&model, mask, t, -BOUNDARY_STEP_S)?;
        let end_time = find_cutoff(&model, mask, t, BOUNDARY_STEP_S)?;
        let max_alt = find_max_alt(&model, t)?;

        Ok(Access {
            satellite: satellite.clone(),
            groundstation: station.clone(),
            start_time,
            end_time,
            max_alt,
        })
    }

    /// Recover the access overlapping `[start, end]` by way of its midpoint.
    pub fn from_overlap(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        satellite: &Satellite,
        station: &GroundStation,
        timescale: &TimeScale,
    ) -> Result<Self> {
        Access::from_time(timescale.midpoint(start, end), satellite, station)
    }

    /// A copy clipped to `[start, end]`.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Access {
        let mut access = self.clone();
        access.start_time = self.start_time.max(start);
        access.end_time = self.end_time.min(end);
        access
    }

    pub fn satellite(&self) -> &Satellite {
        &self.satellite
    }

    pub fn groundstation(&self) -> &GroundStation {
        &self.groundstation
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Elevation at the interior maximum, degrees.
    pub fn max_alt(&self) -> f64 {
        self.max_alt
    }

    /// Compact opaque token identifying this access by its midpoint.
    pub fn access_id(&self, codec: &AccessIdCodec, timescale: &TimeScale) -> Result<String> {
        let mid = timescale.midpoint(self.start_time, self.end_time);
        codec.encode(&self.satellite.hwid, &self.groundstation.hwid, mid)
    }

    pub fn to_projection(
        &self,
        codec: &AccessIdCodec,
        timescale: &TimeScale,
    ) -> Result<AccessProjection> {
        Ok(AccessProjection {
            id: self.access_id(codec, timescale)?,
            satellite: self.satellite.hwid.clone(),
            groundstation: self.groundstation.hwid.clone(),
            start_time: timescale.iso_micro(self.start_time),
            end_time: timescale.iso_micro(self.end_time),
            max_alt: round3(self.max_alt),
        })
    }
}

pub(crate) fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Adaptive-step search for the time where elevation crosses the horizon
/// cutoff. Steps forward by `step`; when the cutoff-relative elevation
/// changes sign across a step, halves the step and reverses direction;
/// stops when the elevation is within sigma of the cutoff. The sign of the
/// initial step dictates which boundary is found.
fn find_cutoff(
    model: &OrbitalModel,
    mask: &HorizonMask,
    t: DateTime<Utc>,
    initial_step: f64,
) -> Result<DateTime<Utc>> {
    let mut time = t;
    let mut sample = model.observe(time)?;
    let mut step = initial_step;

    for _ in 0..MAX_SEARCH_ITERATIONS {
        let offset = sample.altitude_deg - mask.cutoff(sample.azimuth_deg);
        if offset.abs() < BOUNDARY_SIGMA_DEG {
            return Ok(time);
        }

        let next_time = add_seconds(time, step);
        let next = model.observe(next_time)?;
        let next_offset = next.altitude_deg - mask.cutoff(next.azimuth_deg);

        if next_offset * offset < 0.0 {
            step = -step / 2.0;
        }
        time = next_time;
        sample = next;
    }

    Err(Error::NoConvergence {
        what: "horizon crossing search",
        iterations: MAX_SEARCH_ITERATIONS,
    })
}

/// Adaptive-step climb to the elevation maximum: reverse and halve the step
/// whenever elevation starts descending, stop when the step is negligible.
/// Returns the unmasked elevation at the maximum.
fn find_max_alt(model: &OrbitalModel, t: DateTime<Utc>) -> Result<f64> {
    let mut time = t;
    let mut sample = model.observe(time)?;
    let mut step = BOUNDARY_STEP_S;

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if step.abs() < MAX_ALT_SIGMA_S {
            return Ok(sample.altitude_deg);
        }

        let next_time = add_seconds(time, step);
        let next = model.observe(next_time)?;

        if next.altitude_deg < sample.altitude_deg {
            step = -step / 2.0;
        }
        time = next_time;
        sample = next;
    }

    Err(Error::NoConvergence {
        what: "max altitude search",
        iterations: MAX_SEARCH_ITERATIONS,
    })
}
