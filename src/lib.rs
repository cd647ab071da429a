//! Juniper - polling-station geocoding and consolidation pipeline.
//!
//! This library provides shared types and modules for the process and
//! consolidate binaries.

pub mod geocode;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;

pub use models::{Coordinates, RawStationRow, StationRecord};
