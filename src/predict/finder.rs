use chrono::{DateTime, Utc};
use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{GroundStation, Satellite};
use crate::predict::access::Access;
use crate::predict::propagation::OrbitalModel;
use crate::time::add_seconds;

/// Peak refinement converges when the bracket shrinks below one second.
const PEAK_TOLERANCE_S: f64 = 1.0;
/// Boundary roots converge when the bracket shrinks below one second.
const ROOT_TOLERANCE_S: f64 = 1.0;
const MAX_REFINE_ITERATIONS: u32 = 200;
const MAX_ROOT_ITERATIONS: u32 = 200;
/// Coarse steps to march away from a peak while bracketing a boundary.
const MAX_BRACKET_STEPS: u32 = 8;

const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Finds every visibility window between a satellite and a ground station
/// in a time interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessFinder {
    _priv: (),
}

impl AccessFinder {
    pub fn new() -> Self {
        AccessFinder { _priv: () }
    }

    /// All accesses in `[start, end]`, ascending by start time and
    /// non-overlapping. Coarse-samples the cutoff-relative elevation at a
    /// sixth of the orbital period, refines each local maximum, then finds
    /// the rising and setting boundary on either side of each visible peak.
    pub fn find(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Access>> {
        if end < start {
            return Err(Error::validation("range", "end cannot be before start"));
        }

        let model = OrbitalModel::new(satellite, station)?;
        let mask = &station.horizon_mask;
        let step = model.period_seconds() / 6.0;

        // elevation above the per-azimuth horizon cutoff
        let above = |t: DateTime<Utc>| -> Result<f64> {
            let sample = model.observe(t)?;
            Ok(sample.altitude_deg - mask.cutoff(sample.azimuth_deg))
        };

        let mut times = Vec::new();
        let mut values = Vec::new();
        let mut t = add_seconds(start, -step);
        let stop = add_seconds(end, 2.0 * step);
        while t <= stop {
            times.push(t);
            values.push(above(t)?);
            t = add_seconds(t, step);
        }

        let mut accesses = Vec::new();
        for i in local_maxima(&values) {
            let peak = refine_peak(&above, times[i], step)?;
            if above(peak)? <= 0.0 {
                continue;
            }

            let rising = find_root(&above, peak, -step)?;
            let setting = find_root(&above, peak, step)?;
            let max_alt = model.observe(peak)?.altitude_deg;

            accesses.push(Access::new(
                satellite.clone(),
                station.clone(),
                rising,
                setting,
                max_alt,
            ));
        }

        accesses.sort_by_key(|a| a.start_time());
        debug!(
            "found {} accesses for ({}, {}) in [{}, {}]",
            accesses.len(),
            satellite.hwid,
            station.hwid,
            start,
            end
        );
        Ok(accesses)
    }

    /// Accesses for every (satellite, groundstation) pair, computed on a
    /// worker pool. Each pair is independent: workers receive immutable
    /// inputs and return pure results.
    pub fn find_all(
        &self,
        satellites: &[Satellite],
        stations: &[GroundStation],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Access>> {
        let mut pairs = Vec::new();
        for satellite in satellites {
            for station in stations {
                pairs.push((satellite, station));
            }
        }

        let nested: Vec<Vec<Access>> = pairs
            .par_iter()
            .map(|(satellite, station)| self.find(satellite, station, start, end))
            .collect::<Result<_>>()?;

        let mut accesses: Vec<Access> = nested.into_iter().flatten().collect();
        accesses.sort_by_key(|a| a.start_time());
        Ok(accesses)
    }
}

/// Indices whose forward difference is negative and backward difference is
/// positive: a rising-then-falling local maximum.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    for i in 0..values.len() {
        let left = if i == 0 { 0.0 } else { values[i] - values[i - 1] };
        let right = if i + 1 == values.len() {
            0.0
        } else {
            values[i + 1] - values[i]
        };
        if left > 0.0 && right < 0.0 {
            maxima.push(i);
        }
    }
    maxima
}

/// Golden-section maximization of `f` over `[center - step, center + step]`.
fn refine_peak<F>(f: &F, center: DateTime<Utc>, step: f64) -> Result<DateTime<Utc>>
where
    F: Fn(DateTime<Utc>) -> Result<f64>,
{
    let mut a = -step;
    let mut b = step;
    let mut c = b - (b - a) * INV_PHI;
    let mut d = a + (b - a) * INV_PHI;
    let mut fc = f(add_seconds(center, c))?;
    let mut fd = f(add_seconds(center, d))?;

    for _ in 0..MAX_REFINE_ITERATIONS {
        if (b - a).abs() <= PEAK_TOLERANCE_S {
            return Ok(add_seconds(center, (a + b) / 2.0));
        }
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - (b - a) * INV_PHI;
            fc = f(add_seconds(center, c))?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + (b - a) * INV_PHI;
            fd = f(add_seconds(center, d))?;
        }
    }

    Err(Error::NoConvergence {
        what: "peak refinement",
        iterations: MAX_REFINE_ITERATIONS,
    })
}

/// Bracketed bisection for the horizon crossing on one side of a visible
/// peak. Marches away from the peak in coarse steps until the function goes
/// negative, then bisects the sign change down to the time tolerance.
fn find_root<F>(f: &F, peak: DateTime<Utc>, step: f64) -> Result<DateTime<Utc>>
where
    F: Fn(DateTime<Utc>) -> Result<f64>,
{
    // offsets in seconds relative to the peak
    let mut inside = 0.0;
    let mut outside = step;
    let mut bracketed = false;
    for _ in 0..MAX_BRACKET_STEPS {
        if f(add_seconds(peak, outside))? < 0.0 {
            bracketed = true;
            break;
        }
        inside = outside;
        outside += step;
    }
    if !bracketed {
        return Err(Error::NoConvergence {
            what: "boundary bracketing",
            iterations: MAX_BRACKET_STEPS,
        });
    }

    for _ in 0..MAX_ROOT_ITERATIONS {
        if (outside - inside).abs() <= ROOT_TOLERANCE_S {
            return Ok(add_seconds(peak, (inside + outside) / 2.0));
        }
        let mid = (inside + outside) / 2.0;
        if f(add_seconds(peak, mid))? > 0.0 {
            inside = mid;
        } else {
            outside = mid;
        }
    }

    Err(Error::NoConvergence {
        what: "boundary root finding",
        iterations: MAX_ROOT_ITERATIONS,
    })
}
