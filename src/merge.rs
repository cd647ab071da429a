//! Partition merge and validation.
//!
//! Combines independently processed partition files into one dataset:
//! the base partition is truncated at its authoritative id boundary,
//! partitions are concatenated in caller order, and the result is checked
//! for duplicate ids and coordinate coverage. Duplicates are reported,
//! never silently resolved.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::StationRecord;

/// Bucket label for records whose district field is empty.
pub const UNCLASSIFIED_DISTRICT: &str = "unclassified";

/// Merge inputs, loadable from a TOML file or assembled from CLI flags.
#[derive(Debug, Deserialize, Clone)]
pub struct MergeConfig {
    /// Base partition candidates, tried in order; first readable wins
    pub base_candidates: Vec<PathBuf>,
    /// Last id the base partition is authoritative for
    pub base_max_id: u64,
    /// Later partition files, lowest id range first
    pub partitions: Vec<PathBuf>,
    pub output: PathBuf,
}

impl MergeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read merge config file")?;
        let config: MergeConfig =
            toml::from_str(&content).context("Failed to parse merge config file")?;
        Ok(config)
    }
}

/// One partition's records plus a label for duplicate reporting.
#[derive(Debug, Clone)]
pub struct Partition {
    pub label: String,
    pub records: Vec<StationRecord>,
}

impl Partition {
    pub fn new(label: impl Into<String>, records: Vec<StationRecord>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }
}

/// An id that occurred more than once after concatenation.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateId {
    pub id: String,
    pub count: usize,
    /// Label of the partition contributing each occurrence
    pub sources: Vec<String>,
}

/// Validation summary for one merge run.
#[derive(Debug, Serialize)]
pub struct MergeReport {
    pub total_records: usize,
    pub duplicates: Vec<DuplicateId>,
    pub with_coordinates: usize,
    pub coverage_pct: f64,
    pub district_counts: BTreeMap<String, usize>,
}

impl MergeReport {
    pub fn log(&self) {
        info!("Consolidated {} records", self.total_records);

        if self.duplicates.is_empty() {
            info!("No duplicate ids");
        } else {
            warn!("{} duplicate ids detected", self.duplicates.len());
            for dup in &self.duplicates {
                warn!(
                    "  {} appears {} times (from {})",
                    dup.id,
                    dup.count,
                    dup.sources.join(", ")
                );
            }
        }

        info!(
            "Coordinate coverage: {}/{} ({:.1}%)",
            self.with_coordinates, self.total_records, self.coverage_pct
        );

        info!("Stations per district:");
        for (district, count) in &self.district_counts {
            info!("  {}: {}", district, count);
        }
    }
}

/// Numeric suffix of a "station_<n>" id.
pub fn station_ordinal(id: &str) -> Option<u64> {
    id.strip_prefix("station_")?.parse().ok()
}

/// Read one partition file into records.
pub fn load_partition<P: AsRef<Path>>(path: P) -> Result<Vec<StationRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read partition file {}", path.display()))?;
    let records: Vec<StationRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse partition file {}", path.display()))?;
    Ok(records)
}

/// Try candidate base files in order, returning the first that loads.
///
/// A missing or unreadable candidate is logged and the next one is tried;
/// only exhausting the whole list is fatal.
pub fn load_first_available(candidates: &[PathBuf]) -> Result<(PathBuf, Vec<StationRecord>)> {
    for candidate in candidates {
        match load_partition(candidate) {
            Ok(records) => {
                info!(
                    "Loaded base partition {} ({} records)",
                    candidate.display(),
                    records.len()
                );
                return Ok((candidate.clone(), records));
            }
            Err(e) => {
                warn!(
                    "Base partition {} unavailable, trying next candidate: {:#}",
                    candidate.display(),
                    e
                );
            }
        }
    }

    let tried: Vec<String> = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    anyhow::bail!("No base partition available; tried: {}", tried.join(", "))
}

/// Drop base-partition records past the authoritative id boundary.
///
/// Stray records above `max_id` would double-count ids that a later, more
/// complete partition also covers. Records with a malformed id are dropped
/// too, with a warning.
pub fn filter_base(records: Vec<StationRecord>, max_id: u64) -> Vec<StationRecord> {
    let before = records.len();
    let kept: Vec<StationRecord> = records
        .into_iter()
        .filter(|record| match station_ordinal(&record.id) {
            Some(n) => n <= max_id,
            None => {
                warn!("Dropping base record with malformed id: {}", record.id);
                false
            }
        })
        .collect();

    info!(
        "Filtered base partition to id <= {}: kept {} of {}",
        max_id,
        kept.len(),
        before
    );
    kept
}

/// Concatenate partitions in the given order and validate the result.
///
/// The caller passes the already-filtered base partition first. Every id
/// is counted; ids occurring more than once are reported with all source
/// partitions and remain in the output as-is. The report also carries
/// coordinate coverage and per-district counts (empty districts bucketed
/// under [`UNCLASSIFIED_DISTRICT`], iterated in sorted order).
pub fn merge_partitions(partitions: Vec<Partition>) -> (Vec<StationRecord>, MergeReport) {
    let mut merged: Vec<StationRecord> = Vec::new();
    let mut occurrences: HashMap<String, Vec<String>> = HashMap::new();

    for partition in partitions {
        for record in partition.records {
            occurrences
                .entry(record.id.clone())
                .or_default()
                .push(partition.label.clone());
            merged.push(record);
        }
    }

    let mut duplicates: Vec<DuplicateId> = occurrences
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(id, sources)| DuplicateId {
            count: sources.len(),
            id,
            sources,
        })
        .collect();
    // Sort numerically where possible so the report reads in id order.
    duplicates.sort_by_key(|dup| (station_ordinal(&dup.id), dup.id.clone()));

    let with_coordinates = merged
        .iter()
        .filter(|record| record.coordinates.is_some())
        .count();
    let coverage_pct = if merged.is_empty() {
        0.0
    } else {
        with_coordinates as f64 / merged.len() as f64 * 100.0
    };

    let mut district_counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in &merged {
        let district = record.district.trim();
        let key = if district.is_empty() {
            UNCLASSIFIED_DISTRICT.to_string()
        } else {
            district.to_string()
        };
        *district_counts.entry(key).or_insert(0) += 1;
    }

    let report = MergeReport {
        total_records: merged.len(),
        duplicates,
        with_coordinates,
        coverage_pct,
        district_counts,
    };

    (merged, report)
}
