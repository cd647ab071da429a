//! Polling-station processing pipeline.
//!
//! Reads raw station rows from CSV, geocodes each address through the
//! rate-limited resolver, and writes one partition JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use juniper::geocode::{GeocodeResolver, RatePolicy};
use juniper::merge::load_partition;
use juniper::output::write_records;
use juniper::pipeline::{process_rows, reprocess_missing};
use juniper::RawStationRow;

#[derive(Parser, Debug)]
#[command(name = "process")]
#[command(about = "Geocode polling-station rows into a partition file")]
struct Args {
    /// CSV file of raw station rows
    #[arg(short, long, required_unless_present = "retry")]
    input: Option<PathBuf>,

    /// Output partition JSON file
    #[arg(short, long)]
    output: PathBuf,

    /// Process at most this many rows
    #[arg(long)]
    limit: Option<usize>,

    /// Skip this many leading rows; id assignment starts after them
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Delay between external geocoding calls, in milliseconds
    #[arg(long, default_value = "1000")]
    delay_ms: u64,

    /// Re-geocode records without coordinates in an existing partition
    /// instead of processing CSV input
    #[arg(long)]
    retry: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut resolver = GeocodeResolver::new(RatePolicy::with_interval(Duration::from_millis(
        args.delay_ms,
    )));

    if let Some(existing) = &args.retry {
        let records = load_partition(existing)?;
        info!(
            "Retrying unresolved records from {} ({} total)",
            existing.display(),
            records.len()
        );

        let (updated, resolved) = reprocess_missing(records, &mut resolver).await;
        write_records(&args.output, &updated)?;
        info!(
            "Wrote {} records to {} ({} newly resolved)",
            updated.len(),
            args.output.display(),
            resolved
        );
        return Ok(());
    }

    let input = args.input.as_ref().context("--input is required")?;
    let mut rows = read_rows(input)?;
    info!("Read {} rows from {}", rows.len(), input.display());

    if args.offset > 0 {
        rows.drain(..args.offset.min(rows.len()));
    }
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    info!(
        "Processing {} rows starting at id station_{}",
        rows.len(),
        args.offset + 1
    );

    let stations = process_rows(&rows, &mut resolver, args.offset).await?;

    write_records(&args.output, &stations)?;
    info!(
        "Wrote {} records to {}",
        stations.len(),
        args.output.display()
    );

    Ok(())
}

fn read_rows(path: &Path) -> Result<Vec<RawStationRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // A malformed row never aborts the batch.
            Err(e) => warn!("Skipping unreadable CSV row {}: {}", index + 1, e),
        }
    }
    Ok(rows)
}
