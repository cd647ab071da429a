//! Station record structures shared by the process and consolidate binaries.

use serde::{Deserialize, Serialize};

/// One raw row from the tabular source.
///
/// Accepts both English column names and the original Korean spreadsheet
/// headers, since partition files have historically used either.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStationRow {
    /// Province / metropolitan city (시도)
    #[serde(alias = "시도", default)]
    pub province: String,

    /// County or city within the province (구시군명)
    #[serde(alias = "구시군명", default)]
    pub county: String,

    /// Sub-district (읍면동명)
    #[serde(alias = "읍면동명", default)]
    pub sub_district: String,

    /// Station display name (사전투표소명)
    #[serde(alias = "사전투표소명", default)]
    pub name: String,
}

/// Geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build a pair only if both components are finite and within the
    /// valid global ranges.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        if lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
        {
            Some(Self { lat, lng })
        } else {
            None
        }
    }
}

/// Morning/afternoon livestream links, filled in later by operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeUrls {
    #[serde(default)]
    pub morning: String,
    #[serde(default)]
    pub afternoon: String,
}

/// The canonical polling-station record, one per source row.
///
/// Serialized in camelCase to match the consumer-facing JSON shape.
/// `coordinates` is omitted entirely when geocoding failed; runtime fields
/// (`isActive`, counters, alerts, URLs) are initialized to defaults and not
/// otherwise touched by this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    /// Unique identifier: "station_<n>", n = 1-based row ordinal
    pub id: String,

    pub name: String,

    /// Normalized full address used as the geocoding query
    pub address: String,

    /// Raw province field, retained for per-district reporting
    pub district: String,

    pub gugun: String,

    pub dong: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub entry_count: i64,

    #[serde(default)]
    pub exit_count: i64,

    #[serde(default)]
    pub alerts: Vec<serde_json::Value>,

    #[serde(default)]
    pub youtube_urls: YoutubeUrls,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_checked_ranges() {
        assert!(Coordinates::checked(37.5665, 126.978).is_some());
        assert!(Coordinates::checked(91.0, 0.0).is_none());
        assert!(Coordinates::checked(0.0, -181.0).is_none());
        assert!(Coordinates::checked(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_record_serializes_camel_case_without_coordinates() {
        let record = StationRecord {
            id: "station_1".to_string(),
            name: "서울시청".to_string(),
            address: "서울특별시 중구 명동".to_string(),
            district: "서울특별시".to_string(),
            gugun: "중구".to_string(),
            dong: "명동".to_string(),
            coordinates: None,
            is_active: false,
            entry_count: 0,
            exit_count: 0,
            alerts: Vec::new(),
            youtube_urls: YoutubeUrls::default(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("coordinates").is_none());
        assert_eq!(json["isActive"], false);
        assert_eq!(json["entryCount"], 0);
        assert_eq!(json["exitCount"], 0);
        assert_eq!(json["youtubeUrls"]["morning"], "");
        assert_eq!(json["youtubeUrls"]["afternoon"], "");
        // Korean text stays literal, not \u-escaped
        let text = serde_json::to_string(&record).unwrap();
        assert!(text.contains("서울시청"));
    }

    #[test]
    fn test_raw_row_accepts_korean_headers() {
        let row: RawStationRow = serde_json::from_str(
            r#"{"시도": "서울특별시", "구시군명": "종로구", "읍면동명": "청운효자동", "사전투표소명": "청운효자동주민센터"}"#,
        )
        .unwrap();
        assert_eq!(row.province, "서울특별시");
        assert_eq!(row.county, "종로구");
        assert_eq!(row.sub_district, "청운효자동");
        assert_eq!(row.name, "청운효자동주민센터");
    }
}
