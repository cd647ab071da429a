//! Nominatim lookup client with a per-run address cache and call pacing.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Coordinates;

const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Appended to every query; the dataset is Korea-only.
const COUNTRY_QUALIFIER: &str = "South Korea";

/// Pacing between external lookups.
///
/// Nominatim's usage policy allows at most one request per second per
/// client, so the production policy sleeps one second after every cache
/// miss. Tests inject [`RatePolicy::none`] to run without delay.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    min_interval: Duration,
}

impl RatePolicy {
    /// One call per second, per the Nominatim usage policy.
    pub fn nominatim() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
        }
    }

    /// No delay between calls.
    pub fn none() -> Self {
        Self {
            min_interval: Duration::ZERO,
        }
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    async fn pause(&self) {
        if !self.min_interval.is_zero() {
            tokio::time::sleep(self.min_interval).await;
        }
    }
}

/// One entry of the Nominatim search response list.
///
/// Coordinates come back as strings and are parsed to floats here.
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
}

/// Parse the first result of a Nominatim response list.
///
/// Returns `None` for an empty list, unparseable values, or coordinates
/// outside the valid global ranges.
pub fn parse_coordinates(places: &[NominatimPlace]) -> Option<Coordinates> {
    let place = places.first()?;
    let lat: f64 = place.lat.parse().ok()?;
    let lng: f64 = place.lon.parse().ok()?;
    Coordinates::checked(lat, lng)
}

/// Resolves canonical addresses to coordinates.
///
/// Owns the HTTP client, the per-run address cache, and the pacing policy.
/// The cache stores failures as well as successes so a bad address is only
/// attempted once per run. All lookups are sequential; the caller drives
/// one address at a time.
pub struct GeocodeResolver {
    client: Client,
    /// Cache of canonical address → resolved coordinates (None = known failure)
    cache: HashMap<String, Option<Coordinates>>,
    policy: RatePolicy,
}

impl GeocodeResolver {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            client: Client::builder()
                .user_agent("Juniper/0.1 (polling-station mapper)")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            cache: HashMap::new(),
            policy,
        }
    }

    /// Resolve one address.
    ///
    /// A cache hit (success or failure) returns immediately with no
    /// external call and no delay. A miss issues one lookup, caches the
    /// outcome either way, then enforces the pacing delay. Failure is
    /// never fatal: the caller gets `None` and moves on.
    pub async fn resolve(&mut self, address: &str) -> Option<Coordinates> {
        if let Some(entry) = self.cache.get(address) {
            debug!("Cache hit for: {}", address);
            return *entry;
        }

        let result = self.lookup(address).await;
        self.cache.insert(address.to_string(), result);
        self.policy.pause().await;
        result
    }

    async fn lookup(&self, address: &str) -> Option<Coordinates> {
        let query = format!("{}, {}", address, COUNTRY_QUALIFIER);

        let response = match self
            .client
            .get(NOMINATIM_ENDPOINT)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Geocoding request failed for '{}': {}", address, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Geocoding query for '{}' failed with status {}",
                address,
                response.status()
            );
            return None;
        }

        let places: Vec<NominatimPlace> = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to parse geocoding response for '{}': {}", address, e);
                return None;
            }
        };

        match parse_coordinates(&places) {
            Some(coords) => {
                debug!("Resolved '{}' to {}, {}", address, coords.lat, coords.lng);
                Some(coords)
            }
            None => {
                warn!("No geocoding result for '{}'", address);
                None
            }
        }
    }

    /// Number of distinct addresses attempted this run.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Pre-populate the cache so tests never reach the network.
    #[cfg(test)]
    pub(crate) fn seed(&mut self, address: &str, entry: Option<Coordinates>) {
        self.cache.insert(address.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates_exact_conversion() {
        let places = vec![NominatimPlace {
            lat: "37.5".to_string(),
            lon: "127.0".to_string(),
        }];
        let coords = parse_coordinates(&places).unwrap();
        assert_eq!(coords.lat, 37.5);
        assert_eq!(coords.lng, 127.0);
    }

    #[test]
    fn test_parse_coordinates_empty_list() {
        assert!(parse_coordinates(&[]).is_none());
    }

    #[test]
    fn test_parse_coordinates_malformed_values() {
        let places = vec![NominatimPlace {
            lat: "not-a-number".to_string(),
            lon: "127.0".to_string(),
        }];
        assert!(parse_coordinates(&places).is_none());
    }

    #[test]
    fn test_parse_coordinates_out_of_range() {
        let places = vec![NominatimPlace {
            lat: "137.5".to_string(),
            lon: "127.0".to_string(),
        }];
        assert!(parse_coordinates(&places).is_none());
    }

    #[tokio::test]
    async fn test_cached_success_returned_without_lookup() {
        let mut resolver = GeocodeResolver::new(RatePolicy::none());
        let coords = Coordinates {
            lat: 37.5665,
            lng: 126.978,
        };
        resolver
            .cache
            .insert("서울특별시 중구".to_string(), Some(coords));

        // No network: the cache entry short-circuits the lookup.
        let result = resolver.resolve("서울특별시 중구").await;
        assert_eq!(result, Some(coords));
        assert_eq!(resolver.cache_size(), 1);
    }

    #[tokio::test]
    async fn test_cached_failure_not_retried() {
        let mut resolver = GeocodeResolver::new(RatePolicy::none());
        resolver.cache.insert("없는 주소".to_string(), None);

        let result = resolver.resolve("없는 주소").await;
        assert!(result.is_none());
        assert_eq!(resolver.cache_size(), 1);
    }
}
