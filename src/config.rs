use serde::Deserialize;
use thiserror::Error;

use crate::model::{GroundStation, HorizonMask};
use crate::schedule::DEFAULT_GUARD_TIME_S;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid station config: {0}")]
    Station(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_guard_time_s")]
    pub guard_time_s: i64,
}

fn default_guard_time_s() -> i64 {
    DEFAULT_GUARD_TIME_S
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub hwid: String,
    /// "lat, lon" in decimal degrees.
    pub coordinates: String,
    #[serde(default)]
    pub elevation_m: f64,
    /// 360 per-degree elevation cutoffs; omitted means a flat horizon
    /// at `default_cutoff_deg`.
    pub horizon_mask: Option<Vec<f64>>,
    #[serde(default = "default_cutoff_deg")]
    pub default_cutoff_deg: f64,
    #[serde(default)]
    pub passes_read_only: bool,
}

fn default_cutoff_deg() -> f64 {
    5.0
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn groundstation(&self) -> Result<GroundStation, ConfigError> {
        self.station.groundstation()
    }
}

impl StationConfig {
    pub fn groundstation(&self) -> Result<GroundStation, ConfigError> {
        let parts: Vec<_> = self.coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            return Err(ConfigError::Station(format!(
                "coordinates must be \"lat, lon\", got {:?}",
                self.coordinates
            )));
        }
        let lat: f64 = parts[0]
            .parse()
            .map_err(|_| ConfigError::Station(format!("bad latitude {:?}", parts[0])))?;
        let lon: f64 = parts[1]
            .parse()
            .map_err(|_| ConfigError::Station(format!("bad longitude {:?}", parts[1])))?;

        let mask = match &self.horizon_mask {
            Some(values) => HorizonMask::new(values.clone())
                .map_err(|e| ConfigError::Station(e.to_string()))?,
            None => HorizonMask::uniform(self.default_cutoff_deg),
        };

        let mut gs = GroundStation::new(&self.hwid, lat, lon, self.elevation_m, mask);
        gs.passes_read_only = self.passes_read_only;
        Ok(gs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let yaml = r#"
station:
  hwid: gs-wellington
  coordinates: "-41.28, 174.77"
  elevation_m: 20.0
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cache.retention_days, 2);
        assert_eq!(config.guard_time_s, DEFAULT_GUARD_TIME_S);

        let gs = config.groundstation().unwrap();
        assert_eq!(gs.hwid, "gs-wellington");
        assert!((gs.latitude + 41.28).abs() < 1e-9);
        assert!((gs.longitude - 174.77).abs() < 1e-9);
        assert!((gs.horizon_mask.cutoff(123.0) - 5.0).abs() < 1e-9);
        assert!(!gs.passes_read_only);
    }

    #[test]
    fn explicit_mask_overrides_the_flat_default() {
        let yaml = format!(
            "station:\n  hwid: gs-1\n  coordinates: \"0, 0\"\n  horizon_mask: [{}]\n",
            vec!["10.0"; 360].join(", ")
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let gs = config.groundstation().unwrap();
        assert!((gs.horizon_mask.cutoff(0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn short_mask_is_rejected() {
        let yaml = "station:\n  hwid: gs-1\n  coordinates: \"0, 0\"\n  horizon_mask: [5.0, 5.0]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.groundstation(),
            Err(ConfigError::Station(_))
        ));
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let yaml = "station:\n  hwid: gs-1\n  coordinates: \"not coordinates\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.groundstation(),
            Err(ConfigError::Station(_))
        ));
    }
}
