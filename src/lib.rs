//! Visibility window computation and pass scheduling for satellite ground
//! stations: an SGP4-backed access finder, a day-bucketed result cache,
//! opaque access tokens, conflict-guarded pass records and antenna track
//! generation.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod predict;
pub mod schedule;
pub mod time;
pub mod token;
pub mod track;

pub use error::{Error, Result};
