mod access;
mod finder;
mod propagation;

pub use access::{Access, AccessProjection};
pub use finder::AccessFinder;
pub use propagation::{AltAz, OrbitalModel};
