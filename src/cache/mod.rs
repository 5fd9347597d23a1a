mod calculator;
mod store;

pub use calculator::{
    fingerprint, filter_range, sweep_cache, CachedAccessCalculator, RangeInclusive, DEFAULT_LIMIT,
};
pub use store::{AccessCacheStore, CachedAccessRow, MemoryAccessCache};
