use serde::{Deserialize, Serialize};

use crate::model::HorizonMask;

/// A fixed ground station: geodetic position plus a per-degree horizon mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub hwid: String,
    pub latitude: f64,
    pub longitude: f64,
    /// In meters.
    pub elevation_m: f64,
    pub horizon_mask: HorizonMask,
    /// Stations managed by an external scheduler refuse manual passes.
    #[serde(default)]
    pub passes_read_only: bool,
}

impl GroundStation {
    pub fn new(
        hwid: impl Into<String>,
        latitude: f64,
        longitude: f64,
        elevation_m: f64,
        horizon_mask: HorizonMask,
    ) -> Self {
        GroundStation {
            hwid: hwid.into(),
            latitude,
            longitude,
            elevation_m,
            horizon_mask,
            passes_read_only: false,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let sin_lon = lon.sin();
        let cos_lon = lon.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.elevation_m / 1000.0;
        let x = (n + alt_km) * cos_lat * cos_lon;
        let y = (n + alt_km) * cos_lat * sin_lon;
        let z = (n * (1.0 - e2) + alt_km) * sin_lat;
        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equatorial_station_sits_on_x_axis() {
        let gs = GroundStation::new("gs-1", 0.0, 0.0, 0.0, HorizonMask::uniform(5.0));
        let [x, y, z] = gs.position_ecef_km();
        assert!((x - 6378.137).abs() < 1e-6);
        assert!(y.abs() < 1e-9);
        assert!(z.abs() < 1e-9);
    }

    #[test]
    fn elevation_extends_radius() {
        let low = GroundStation::new("gs-1", 0.0, 0.0, 0.0, HorizonMask::uniform(0.0));
        let high = GroundStation::new("gs-1", 0.0, 0.0, 1000.0, HorizonMask::uniform(0.0));
        assert!((high.position_ecef_km()[0] - low.position_ecef_km()[0] - 1.0).abs() < 1e-9);
    }
}
