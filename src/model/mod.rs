mod groundstation;
mod horizon;
mod satellite;

pub use groundstation::GroundStation;
pub use horizon::{HorizonMask, MASK_LEN};
pub use satellite::{Satellite, Tle};
