mod guard;
mod pass;
mod store;

pub use guard::{PassConflictGuard, DEFAULT_GUARD_TIME_S};
pub use pass::{Pass, PassProjection};
pub use store::{MemoryPassStore, PassStore};
