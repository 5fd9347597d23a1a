use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};

use crate::error::{Error, Result};
use crate::model::{GroundStation, Satellite};

/// Topocentric look angles from a ground station to a satellite.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AltAz {
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Propagation boundary: a (satellite, groundstation) pair frozen at
/// construction. `observe` is a pure function of time.
pub struct OrbitalModel {
    elements: Elements,
    constants: Constants,
    station_ecef: [f64; 3],
    lat_rad: f64,
    lon_rad: f64,
}

impl OrbitalModel {
    pub fn new(satellite: &Satellite, station: &GroundStation) -> Result<Self> {
        let (elements, constants) = satellite.elements()?;
        Ok(OrbitalModel {
            elements,
            constants,
            station_ecef: station.position_ecef_km(),
            lat_rad: station.lat_rad(),
            lon_rad: station.lon_rad(),
        })
    }

    /// Orbital period implied by the element set's mean motion.
    pub fn period_seconds(&self) -> f64 {
        86_400.0 / self.elements.mean_motion
    }

    pub fn observe(&self, timestamp: DateTime<Utc>) -> Result<AltAz> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| Error::Propagation(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| Error::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let dr = [
            sat_ecef[0] - self.station_ecef[0],
            sat_ecef[1] - self.station_ecef[1],
            sat_ecef[2] - self.station_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let (east, north, up) = ecef_to_enu(dr, self.lat_rad, self.lon_rad);
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let altitude_deg = if range_km > 0.0 {
            (up / range_km).asin().to_degrees()
        } else {
            0.0
        };

        Ok(AltAz {
            altitude_deg,
            azimuth_deg,
            range_km,
        })
    }
}

fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HorizonMask, Tle};
    use chrono::TimeZone;

    const LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn model() -> OrbitalModel {
        let sat = Satellite::new("iss", Tle::new(LINE1, LINE2).unwrap());
        let gs = GroundStation::new("gs-1", 0.0, 0.0, 0.0, HorizonMask::uniform(5.0));
        OrbitalModel::new(&sat, &gs).unwrap()
    }

    #[test]
    fn period_matches_mean_motion() {
        // 15.72 rev/day is roughly a 91.6 minute orbit
        let period = model().period_seconds();
        assert!((5_400.0..5_600.0).contains(&period), "period {period}");
    }

    #[test]
    fn observation_is_physical() {
        let t = Utc.with_ymd_and_hms(2008, 9, 21, 0, 0, 0).unwrap();
        let altaz = model().observe(t).unwrap();
        assert!((-90.0..=90.0).contains(&altaz.altitude_deg));
        assert!((0.0..360.0).contains(&altaz.azimuth_deg));
        // LEO slant range is bounded by a few thousand km when above
        // horizon and by the Earth's diameter plus orbit height otherwise.
        assert!(altaz.range_km > 300.0 && altaz.range_km < 16_000.0);
    }

    #[test]
    fn observation_is_deterministic() {
        let t = Utc.with_ymd_and_hms(2008, 9, 21, 3, 0, 0).unwrap();
        let m = model();
        let a = m.observe(t).unwrap();
        let b = m.observe(t).unwrap();
        assert_eq!(a.altitude_deg, b.altitude_deg);
        assert_eq!(a.azimuth_deg, b.azimuth_deg);
        assert_eq!(a.range_km, b.range_km);
    }
}
