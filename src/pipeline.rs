//! Row-processing pipeline: normalize, geocode, build records.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::geocode::GeocodeResolver;
use crate::models::{Coordinates, RawStationRow, StationRecord, YoutubeUrls};
use crate::normalize::build_address;

/// Assemble one record from a processed row.
///
/// `ordinal` is the 1-based row position within the partition being
/// processed and becomes the numeric suffix of the id. Returns `None`
/// (a logged skip) when the station name or the normalized address is
/// empty. Runtime fields are initialized to their defaults; this
/// pipeline never sets them.
pub fn build_station(
    ordinal: usize,
    row: &RawStationRow,
    address: &str,
    coordinates: Option<Coordinates>,
) -> Option<StationRecord> {
    let name = row.name.trim();
    if name.is_empty() || address.is_empty() {
        debug!("Skipping row {}: empty name or address", ordinal);
        return None;
    }

    Some(StationRecord {
        id: format!("station_{}", ordinal),
        name: name.to_string(),
        address: address.to_string(),
        district: row.province.trim().to_string(),
        gugun: row.county.trim().to_string(),
        dong: row.sub_district.trim().to_string(),
        coordinates,
        is_active: false,
        entry_count: 0,
        exit_count: 0,
        alerts: Vec::new(),
        youtube_urls: YoutubeUrls::default(),
    })
}

/// Process raw rows in order: normalize each address, resolve it through
/// the cache-checked geocoder, and build the record.
///
/// Rows are handled strictly sequentially so the resolver's cache and
/// pacing see every lookup. `ordinal_offset` shifts id assignment so a
/// later partition can start above an earlier partition's range (e.g.
/// offset 1700 for the 1701.. section). Rows with missing data are
/// skipped; failed geocoding keeps the record without coordinates.
pub async fn process_rows(
    rows: &[RawStationRow],
    resolver: &mut GeocodeResolver,
    ordinal_offset: usize,
) -> Result<Vec<StationRecord>> {
    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut stations = Vec::new();
    let mut skipped = 0usize;
    let mut unresolved = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let ordinal = ordinal_offset + index + 1;
        let address = build_address(&row.province, &row.county, &row.sub_district);

        let coordinates = if address.is_empty() {
            None
        } else {
            resolver.resolve(&address).await
        };

        match build_station(ordinal, row, &address, coordinates) {
            Some(station) => {
                if station.coordinates.is_none() {
                    unresolved += 1;
                }
                stations.push(station);
            }
            None => skipped += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Processed {} rows: {} records ({} without coordinates), {} skipped, {} distinct addresses looked up",
        rows.len(),
        stations.len(),
        unresolved,
        skipped,
        resolver.cache_size()
    );

    Ok(stations)
}

/// Re-attempt geocoding for records that ended a previous run without
/// coordinates. Successful lookups are attached in place; everything else
/// is left untouched. Returns the updated records and how many were newly
/// resolved.
pub async fn reprocess_missing(
    mut records: Vec<StationRecord>,
    resolver: &mut GeocodeResolver,
) -> (Vec<StationRecord>, usize) {
    let mut resolved = 0usize;

    for record in records.iter_mut() {
        if record.coordinates.is_some() || record.address.is_empty() {
            continue;
        }
        if let Some(coords) = resolver.resolve(&record.address).await {
            record.coordinates = Some(coords);
            resolved += 1;
            debug!("Recovered coordinates for {}", record.id);
        }
    }

    info!("Reprocessed records: {} newly resolved", resolved);
    (records, resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(province: &str, county: &str, dong: &str, name: &str) -> RawStationRow {
        RawStationRow {
            province: province.to_string(),
            county: county.to_string(),
            sub_district: dong.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_build_station_fills_schema() {
        let r = row("서울특별시", "종로구", "청운효자동", "청운효자동주민센터");
        let coords = Coordinates {
            lat: 37.5849,
            lng: 126.9696,
        };
        let station =
            build_station(7, &r, "서울특별시 종로구 청운효자동", Some(coords)).unwrap();

        assert_eq!(station.id, "station_7");
        assert_eq!(station.name, "청운효자동주민센터");
        assert_eq!(station.district, "서울특별시");
        assert_eq!(station.gugun, "종로구");
        assert_eq!(station.dong, "청운효자동");
        assert_eq!(station.coordinates, Some(coords));
        assert!(!station.is_active);
        assert_eq!(station.entry_count, 0);
        assert_eq!(station.exit_count, 0);
        assert!(station.alerts.is_empty());
        assert_eq!(station.youtube_urls, YoutubeUrls::default());
    }

    #[test]
    fn test_build_station_rejects_empty_name() {
        let r = row("서울특별시", "종로구", "청운효자동", "  ");
        assert!(build_station(1, &r, "서울특별시 종로구 청운효자동", None).is_none());
    }

    #[test]
    fn test_build_station_rejects_empty_address() {
        let r = row("", "", "", "청운효자동주민센터");
        assert!(build_station(1, &r, "", None).is_none());
    }

    #[test]
    fn test_build_station_keeps_record_without_coordinates() {
        let r = row("제주특별자치도", "제주시", "한림읍", "한림읍사무소");
        let station = build_station(3, &r, "제주특별자치도 제주시 한림읍", None).unwrap();
        assert!(station.coordinates.is_none());
    }

    #[tokio::test]
    async fn test_process_rows_assigns_offset_ordinals_and_skips_bad_rows() {
        // Zero-delay resolver with the address pre-failed in the cache,
        // so no network traffic happens.
        let mut resolver = GeocodeResolver::new(crate::geocode::RatePolicy::none());
        resolver.seed("서울특별시 중구 명동", None);
        let rows = vec![
            row("서울특별시", "중구", "명동", "명동주민센터"),
            row("", "", "", "이름만있는투표소"),
            row("서울특별시", "중구", "명동", "명동성당"),
        ];

        let stations = process_rows(&rows, &mut resolver, 1700).await.unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id, "station_1701");
        // The skipped row still consumes its ordinal.
        assert_eq!(stations[1].id, "station_1703");
        // One distinct address, attempted once.
        assert_eq!(resolver.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_reprocess_missing_attaches_recovered_coordinates() {
        let coords = Coordinates {
            lat: 37.5636,
            lng: 126.9838,
        };
        let mut resolver = GeocodeResolver::new(crate::geocode::RatePolicy::none());
        resolver.seed("서울특별시 중구 명동", Some(coords));

        let r = row("서울특별시", "중구", "명동", "명동주민센터");
        let records = vec![
            build_station(1, &r, "서울특별시 중구 명동", None).unwrap(),
            build_station(2, &r, "서울특별시 중구 명동", Some(coords)).unwrap(),
        ];

        let (updated, resolved) = reprocess_missing(records, &mut resolver).await;
        assert_eq!(resolved, 1);
        assert_eq!(updated[0].coordinates, Some(coords));
        assert_eq!(updated[1].coordinates, Some(coords));
    }
}
