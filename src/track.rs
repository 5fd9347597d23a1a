//! Antenna pointing trajectories for a visibility window, as an ordered
//! sample list or as the pass-file text format the station hardware ingests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::predict::{Access, OrbitalModel};
use crate::time::add_seconds;

/// Hardware pass files sample much denser than interactive track queries.
pub const DEFAULT_FILE_DT_S: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    #[serde(with = "iso_micro")]
    pub time: DateTime<Utc>,
    pub azimuth: f64,
    pub altitude: f64,
    pub range_km: f64,
}

/// Samples carry the same ISO-microsecond timestamps as the projections.
mod iso_micro {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&text, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Sample the window at fixed `step_s` from its start. The series always
/// carries one sample past the end so the antenna holds pointing through
/// loss of signal.
pub fn track_points(access: &Access, step_s: f64) -> Result<Vec<TrackPoint>> {
    let model = OrbitalModel::new(access.satellite(), access.groundstation())?;
    let end = access.end_time();

    let mut cursor = access.start_time();
    let mut points = vec![sample(&model, cursor)?];
    while cursor <= end {
        cursor = add_seconds(cursor, step_s);
        points.push(sample(&model, cursor)?);
    }
    Ok(points)
}

fn sample(model: &OrbitalModel, time: DateTime<Utc>) -> Result<TrackPoint> {
    let altaz = model.observe(time)?;
    Ok(TrackPoint {
        time,
        azimuth: altaz.azimuth_deg,
        altitude: altaz.altitude_deg,
        range_km: altaz.range_km,
    })
}

/// Keep the azimuth series continuous across north. When the raw series is
/// not monotonic and reaches past 180, values above 180 are shifted down by
/// a full turn so the traversal crosses 0 instead of wrapping through 360.
pub fn normalize_azimuths(points: &mut [TrackPoint]) {
    let azs: Vec<f64> = points.iter().map(|p| p.azimuth).collect();
    let mut sorted = azs.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let ascending = sorted == azs;
    let descending = sorted.iter().rev().eq(azs.iter());
    if ascending || descending {
        return;
    }

    if azs.iter().any(|az| *az > 180.0) {
        for point in points.iter_mut() {
            if point.azimuth > 180.0 {
                point.azimuth -= 360.0;
            }
        }
    }
}

/// Header fields of the hardware pass-file format. Unset fields render
/// empty, matching what the station firmware accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFileOptions {
    pub sat: String,
    pub sgs: String,
    pub rx_freq: String,
    pub rx_bw: String,
    pub rx_mod: String,
    pub rx_pol: String,
    pub rx_proto: String,
    pub rx_fec: String,
    pub tx_freq: String,
    pub tx_bw: String,
    pub tx_mod: String,
    pub tx_pol: String,
    pub tx_proto: String,
    pub tx_fec: String,
    pub date: String,
    pub aos: String,
    pub dt: f64,
    pub los: String,
}

impl Default for TrackFileOptions {
    fn default() -> Self {
        TrackFileOptions {
            sat: String::new(),
            sgs: String::new(),
            rx_freq: String::new(),
            rx_bw: String::new(),
            rx_mod: String::new(),
            rx_pol: String::new(),
            rx_proto: String::new(),
            rx_fec: String::new(),
            tx_freq: String::new(),
            tx_bw: String::new(),
            tx_mod: String::new(),
            tx_pol: String::new(),
            tx_proto: String::new(),
            tx_fec: String::new(),
            date: String::new(),
            aos: String::new(),
            dt: DEFAULT_FILE_DT_S,
            los: String::new(),
        }
    }
}

/// A complete hardware pass file: header plus one line per track sample.
/// Lines are CRLF-separated; the firmware rejects bare newlines.
#[derive(Debug, Clone)]
pub struct TrackFile {
    options: TrackFileOptions,
    body: Vec<String>,
}

impl TrackFile {
    pub fn new(mut points: Vec<TrackPoint>, options: TrackFileOptions) -> Result<Self> {
        normalize_azimuths(&mut points);

        if let Some(lowest) = points
            .iter()
            .map(|p| p.altitude)
            .min_by(|a, b| a.total_cmp(b))
        {
            if lowest < 0.0 {
                return Err(Error::validation(
                    "altitude",
                    format!("altitude ({lowest}) is out of bounds"),
                ));
            }
        }

        let body = points
            .iter()
            .map(|p| format!("{:.2}, {:.2}, {:.2}, 0.0;", p.azimuth, p.altitude, p.range_km))
            .collect();
        Ok(TrackFile { options, body })
    }

    /// Build the file for a window, sampling at `options.dt` and stamping
    /// the header with the window's satellite, station and timing.
    pub fn from_access(access: &Access, mut options: TrackFileOptions) -> Result<Self> {
        let points = track_points(access, options.dt)?;
        options.sat = access.satellite().catalog_id.clone();
        options.sgs = access.groundstation().hwid.clone();
        options.date = access.start_time().format("%y/%m/%d").to_string();
        options.aos = access.start_time().format("%H:%M:%S%.6f").to_string();
        options.los = access.end_time().format("%H:%M:%S%.6f").to_string();
        TrackFile::new(points, options)
    }

    fn header(&self) -> Vec<String> {
        let o = &self.options;
        vec![
            format!("SAT={}, SGS={};", o.sat, o.sgs),
            format!(
                "RX_FREQ={}, RX_BW={}, RX_MOD={}, RX_POL={}, RX_PROTO={}, RX_FEC={};",
                o.rx_freq, o.rx_bw, o.rx_mod, o.rx_pol, o.rx_proto, o.rx_fec
            ),
            format!(
                "TX_FREQ={}, TX_BW={}, TX_MOD={}, TX_POL={}, TX_PROTO={}, TX_FEC={};",
                o.tx_freq, o.tx_bw, o.tx_mod, o.tx_pol, o.tx_proto, o.tx_fec
            ),
            format!("DATE={}, AOS={}, DT={}, LOS={};", o.date, o.aos, o.dt, o.los),
            "AZ(deg), EL(deg), SLANT(km), Doppler(Hz);".to_string(),
        ]
    }
}

impl fmt::Display for TrackFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.header();
        lines.extend(self.body.iter().cloned());
        write!(f, "{}", lines.join("\r\n"))
    }
}
