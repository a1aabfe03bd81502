//! R-tree backed gazetteer.

use std::io::Read;
use std::path::Path;

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::Deserialize;

use crate::{GeocodeError, Place, ReverseGeocoder};

const EMBEDDED_GAZETTEER: &str = include_str!("../gazetteer/west_yorkshire.csv");

/// One gazetteer row as it appears in the CSV.
#[derive(Debug, Deserialize)]
struct GazetteerRecord {
    lat: f64,
    lon: f64,
    name: String,
    #[serde(default)]
    admin1: String,
    #[serde(default)]
    admin2: String,
    #[serde(default)]
    cc: String,
}

/// A place stored in the R-tree, keyed by its position on the unit sphere.
///
/// Euclidean distance between unit vectors orders places the same way as
/// great-circle distance, so the nearest neighbour is the closest place
/// on the ground.
struct PlaceEntry {
    position: [f64; 3],
    place: Place,
}

impl RTreeObject for PlaceEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for PlaceEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }
}

fn unit_vector(latitude: f64, longitude: f64) -> [f64; 3] {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// An in-memory gazetteer answering nearest-place queries.
pub struct Gazetteer {
    places: RTree<PlaceEntry>,
}

impl Gazetteer {
    /// Loads the gazetteer compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the embedded CSV fails to parse.
    pub fn embedded() -> Result<Self, GeocodeError> {
        Self::from_reader("<embedded>", EMBEDDED_GAZETTEER.as_bytes())
    }

    /// Loads a gazetteer CSV from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, GeocodeError> {
        let file = std::fs::File::open(path).map_err(|e| GeocodeError::Csv {
            path: path.display().to_string(),
            source: e.into(),
        })?;
        Self::from_reader(&path.display().to_string(), file)
    }

    /// Loads a gazetteer CSV from any reader. Rows that fail to parse are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the header cannot be read or no valid
    /// rows remain.
    pub fn from_reader(label: &str, reader: impl Read) -> Result<Self, GeocodeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader.headers().map_err(|e| GeocodeError::Csv {
            path: label.to_string(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for result in csv_reader.deserialize::<GazetteerRecord>() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    log::trace!("  skipping malformed gazetteer row: {e}");
                    continue;
                }
            };
            if !record.lat.is_finite() || !record.lon.is_finite() {
                continue;
            }
            entries.push(PlaceEntry {
                position: unit_vector(record.lat, record.lon),
                place: Place {
                    name: record.name,
                    admin1: record.admin1,
                    admin2: record.admin2,
                    country_code: record.cc,
                    latitude: record.lat,
                    longitude: record.lon,
                },
            });
        }

        if entries.is_empty() {
            return Err(GeocodeError::EmptyGazetteer);
        }

        log::debug!("Loaded {} places from gazetteer {label}", entries.len());

        Ok(Self {
            places: RTree::bulk_load(entries),
        })
    }

    /// Number of places in the gazetteer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.places.size()
    }

    /// Whether the gazetteer holds no places.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.size() == 0
    }
}

impl ReverseGeocoder for Gazetteer {
    fn lookup(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || latitude.abs() > 90.0
            || longitude.abs() > 180.0
        {
            return Err(GeocodeError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        self.places
            .nearest_neighbor(&unit_vector(latitude, longitude))
            .map(|entry| entry.place.clone())
            .ok_or(GeocodeError::EmptyGazetteer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn embedded_gazetteer_loads() {
        let gazetteer = Gazetteer::embedded().unwrap();
        assert!(gazetteer.len() > 30);
    }

    #[test]
    fn resolves_nearest_town() {
        let gazetteer = Gazetteer::embedded().unwrap();

        let place = gazetteer.lookup(53.797, -1.548).unwrap();
        assert_eq!(place.name, "Leeds");
        assert_eq!(place.admin2, "Leeds");

        let place = gazetteer.lookup(53.650, -1.780).unwrap();
        assert_eq!(place.name, "Huddersfield");
        assert_eq!(place.admin2, "Kirklees");
    }

    #[test]
    fn lookup_is_deterministic() {
        let gazetteer = Gazetteer::embedded().unwrap();
        let first = gazetteer.lookup(53.72, -1.70).unwrap();
        for _ in 0..5 {
            assert_eq!(gazetteer.lookup(53.72, -1.70).unwrap(), first);
        }
    }

    #[test]
    fn rejects_invalid_coordinates() {
        let gazetteer = Gazetteer::embedded().unwrap();
        assert!(matches!(
            gazetteer.lookup(f64::NAN, -1.5),
            Err(GeocodeError::InvalidCoordinate { .. })
        ));
        assert!(gazetteer.lookup(91.0, 0.0).is_err());
    }

    #[test]
    fn loads_user_gazetteer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            b"lat,lon,name,admin1,admin2,cc\n\
              51.5074,-0.1278,London,England,Greater London,GB\n\
              bad,row,Nowhere,,,\n\
              53.4808,-2.2426,Manchester,England,Manchester,GB\n",
        )
        .unwrap();

        let gazetteer = Gazetteer::from_path(&path).unwrap();

        assert_eq!(gazetteer.len(), 2);
        assert_eq!(gazetteer.lookup(53.4, -2.1).unwrap().name, "Manchester");
    }

    #[test]
    fn empty_gazetteer_is_an_error() {
        let result = Gazetteer::from_reader("test", "lat,lon,name,admin1,admin2,cc\n".as_bytes());
        assert!(matches!(result, Err(GeocodeError::EmptyGazetteer)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Gazetteer::from_path(&dir.path().join("missing.csv")).is_err());
    }
}
