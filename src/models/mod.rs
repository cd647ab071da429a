//! Core data models for the polling-station pipeline.

pub mod station;

pub use station::{Coordinates, RawStationRow, StationRecord, YoutubeUrls};
