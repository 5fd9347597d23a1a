use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MASK_LEN: usize = 360;

/// Per-degree elevation cutoff lookup. Index `i` holds the minimum elevation
/// (degrees) considered visible at integer azimuth degree `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HorizonMask(Vec<f64>);

impl HorizonMask {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != MASK_LEN {
            return Err(Error::validation(
                "horizon_mask",
                format!("must have length={MASK_LEN}, got {}", values.len()),
            ));
        }
        Ok(HorizonMask(values))
    }

    /// A mask with the same cutoff at every azimuth.
    pub fn uniform(cutoff_deg: f64) -> Self {
        HorizonMask(vec![cutoff_deg; MASK_LEN])
    }

    /// Cutoff for an azimuth. The azimuth is normalized into `[0, 360)` and
    /// the index is taken by truncation toward zero, not rounding; downstream
    /// behavior at exact integer-degree azimuths depends on this.
    pub fn cutoff(&self, azimuth_deg: f64) -> f64 {
        let az = azimuth_deg.rem_euclid(360.0);
        self.0[(az as usize).min(MASK_LEN - 1)]
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for HorizonMask {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        HorizonMask::new(values)
    }
}

impl From<HorizonMask> for Vec<f64> {
    fn from(mask: HorizonMask) -> Vec<f64> {
        mask.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(HorizonMask::new(vec![5.0; 359]).is_err());
        assert!(HorizonMask::new(vec![5.0; 361]).is_err());
        assert!(HorizonMask::new(vec![5.0; 360]).is_ok());
    }

    #[test]
    fn cutoff_truncates_toward_zero() {
        let mut values = vec![0.0; MASK_LEN];
        values[359] = 9.0;
        values[0] = 3.0;
        let mask = HorizonMask::new(values).unwrap();
        assert_eq!(mask.cutoff(359.0), 9.0);
        assert_eq!(mask.cutoff(359.999), 9.0);
        assert_eq!(mask.cutoff(0.999), 3.0);
    }

    #[test]
    fn cutoff_wraps_azimuth() {
        let mut values = vec![0.0; MASK_LEN];
        values[359] = 7.0;
        values[0] = 2.0;
        let mask = HorizonMask::new(values).unwrap();
        assert_eq!(mask.cutoff(-0.5), 7.0);
        assert_eq!(mask.cutoff(360.0), 2.0);
        assert_eq!(mask.cutoff(720.5), 2.0);
    }
}
