#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Offline reverse geocoding.
//!
//! Resolves a coordinate to the nearest named place in a gazetteer. The
//! lookup is a single nearest-neighbour query against an in-memory R-tree,
//! so it is deterministic and never touches the network.
//!
//! The default gazetteer covers the towns of West Yorkshire and is
//! compiled into the binary. A GeoNames-style CSV (`lat,lon,name,admin1,
//! admin2,cc`) can be loaded instead with [`Gazetteer::from_path`].

pub mod gazetteer;

use thiserror::Error;

pub use gazetteer::Gazetteer;

/// A named place from the gazetteer.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Place name (e.g. `"Dewsbury"`).
    pub name: String,
    /// First-level administrative area (e.g. `"England"`).
    pub admin1: String,
    /// Second-level administrative area (e.g. `"Kirklees"`).
    pub admin2: String,
    /// ISO country code.
    pub country_code: String,
    /// Latitude of the place (WGS84).
    pub latitude: f64,
    /// Longitude of the place (WGS84).
    pub longitude: f64,
}

/// Errors from reverse geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The gazetteer contains no places.
    #[error("Gazetteer is empty")]
    EmptyGazetteer,

    /// The query coordinate is not a finite latitude/longitude.
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Queried latitude.
        latitude: f64,
        /// Queried longitude.
        longitude: f64,
    },

    /// The gazetteer file could not be read or parsed.
    #[error("Gazetteer CSV error in {path}: {source}")]
    Csv {
        /// Path (or `"<embedded>"`) of the gazetteer.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Resolves coordinates to the nearest known place.
pub trait ReverseGeocoder {
    /// Returns the single best match for a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the coordinate is invalid or no place
    /// is available.
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError>;
}
