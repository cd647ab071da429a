//! Forward geocoding against the Nominatim HTTP API.

pub mod resolver;

pub use resolver::{parse_coordinates, GeocodeResolver, NominatimPlace, RatePolicy};
