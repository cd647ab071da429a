//! Partition consolidation.
//!
//! Merges processed partition files into the master dataset, validating
//! id uniqueness and reporting coordinate coverage along the way.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use juniper::merge::{
    filter_base, load_first_available, load_partition, merge_partitions, MergeConfig, Partition,
};
use juniper::output::write_records;

#[derive(Parser, Debug)]
#[command(name = "consolidate")]
#[command(about = "Merge partition files into one validated dataset")]
struct Args {
    /// TOML merge config; overrides the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base partition candidates, tried in order
    #[arg(long = "base")]
    base_candidates: Vec<PathBuf>,

    /// Last id the base partition is authoritative for
    #[arg(long, default_value = "1700")]
    base_max_id: u64,

    /// Later partition files, lowest id range first
    #[arg(long = "partition")]
    partitions: Vec<PathBuf>,

    /// Consolidated output JSON file
    #[arg(long, default_value = "polling_stations_complete.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => MergeConfig::load_from_file(path)?,
        None => MergeConfig {
            base_candidates: args.base_candidates,
            base_max_id: args.base_max_id,
            partitions: args.partitions,
            output: args.output,
        },
    };

    if config.base_candidates.is_empty() {
        anyhow::bail!("No base partition candidates given");
    }

    let (base_path, base_records) = load_first_available(&config.base_candidates)?;
    let filtered = filter_base(base_records, config.base_max_id);

    let mut partitions = vec![Partition::new(file_label(&base_path), filtered)];
    for path in &config.partitions {
        let records = load_partition(path)?;
        info!(
            "Loaded partition {} ({} records)",
            path.display(),
            records.len()
        );
        partitions.push(Partition::new(file_label(path), records));
    }

    let (records, report) = merge_partitions(partitions);
    report.log();

    write_records(&config.output, &records)?;
    info!(
        "Wrote {} records to {}",
        records.len(),
        config.output.display()
    );

    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("partition")
        .to_string()
}
