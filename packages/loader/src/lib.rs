#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loads the collision, vehicle and casualty CSV files.
//!
//! The primary loader ([`load_primary`]) cleans the collision file: rows
//! without a parseable date or usable coordinates are dropped, calendar
//! fields and the display road type are derived, and the result is scoped
//! to an allow-list of ONS district codes. Failure to read the collision
//! file is the one fatal error in the toolchain.
//!
//! The linked loaders ([`load_vehicles`], [`load_casualties`]) keep only
//! rows belonging to a known set of collisions. They never fail: a missing
//! or corrupt linked file is logged and yields an empty table.

pub mod parsing;
pub mod progress;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;
use csv::{ByteRecord, StringRecord};
use traffic_map_incident_models::{
    Casualty, CodedLabel, District, INCIDENT_ID_COLUMN, Incident, LEGACY_INCIDENT_ID_COLUMN,
    Vehicle,
};

use crate::parsing::Coded;
use crate::progress::{ProgressCallback, null_progress};

/// Sentinel returned by [`period_of`] when there is nothing to describe.
pub const UNKNOWN_PERIOD: &str = "Unknown Period";

/// Errors that can occur while reading the collision file.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The file could not be opened or its CSV structure is malformed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A linked file lacks both the canonical and the legacy identifier
    /// column.
    #[error("{path} has no 'collision_index' or 'accident_index' column")]
    MissingIdColumn {
        /// Path to the CSV file.
        path: String,
    },
}

/// Row accounting for one run of the primary loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read from the file.
    pub rows_read: u64,
    /// Rows dropped because the date did not parse.
    pub dropped_date: u64,
    /// Rows dropped because a coordinate was missing or malformed.
    pub dropped_coordinates: u64,
    /// Rows dropped because a column the loader reads was not valid UTF-8.
    pub dropped_malformed: u64,
    /// Rows outside the configured districts.
    pub out_of_scope: u64,
    /// Coded cells holding a value outside their domain (stored as absent).
    pub unknown_codes: u64,
    /// Rows returned to the caller.
    pub retained: u64,
}

/// Column positions resolved once from the header row.
struct Header {
    index: BTreeMap<String, usize>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        let index = record
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();
        Self { index }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// The identifier column, preferring the canonical name.
    fn id_position(&self) -> Option<usize> {
        self.position(INCIDENT_ID_COLUMN)
            .or_else(|| self.position(LEGACY_INCIDENT_ID_COLUMN))
    }
}

fn cell(record: &StringRecord, position: Option<usize>) -> Option<&str> {
    record.get(position?)
}

/// Decodes a raw row. Returns `None` when a column in `used` is not valid
/// UTF-8; invalid bytes in any other column are replaced.
fn decode(record: ByteRecord, used: &BTreeSet<usize>) -> Option<StringRecord> {
    let readable = used.iter().all(|&position| {
        record
            .get(position)
            .is_none_or(|field| std::str::from_utf8(field).is_ok())
    });
    readable.then(|| StringRecord::from_byte_record_lossy(record))
}

struct CollisionColumns {
    id: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    severity: Option<usize>,
    weather: Option<usize>,
    light: Option<usize>,
    surface: Option<usize>,
    special_conditions: Option<usize>,
    road_class: Option<usize>,
    road_type: Option<usize>,
    speed_limit: Option<usize>,
    district: Option<usize>,
    urban_rural: Option<usize>,
    number_of_vehicles: Option<usize>,
}

impl CollisionColumns {
    fn resolve(header: &Header) -> Self {
        Self {
            id: header.id_position(),
            date: header.position("date"),
            time: header.position("time"),
            latitude: header.position("latitude"),
            longitude: header.position("longitude"),
            severity: header
                .position("collision_severity")
                .or_else(|| header.position("accident_severity")),
            weather: header.position("weather_conditions"),
            light: header.position("light_conditions"),
            surface: header.position("road_surface_conditions"),
            special_conditions: header.position("special_conditions_at_site"),
            road_class: header.position("first_road_class"),
            road_type: header.position("road_type"),
            speed_limit: header.position("speed_limit"),
            district: header.position("local_authority_ons_district"),
            urban_rural: header.position("urban_or_rural_area"),
            number_of_vehicles: header.position("number_of_vehicles"),
        }
    }

    /// Positions of every resolved column.
    fn used(&self) -> BTreeSet<usize> {
        [
            self.id,
            self.date,
            self.time,
            self.latitude,
            self.longitude,
            self.severity,
            self.weather,
            self.light,
            self.surface,
            self.special_conditions,
            self.road_class,
            self.road_type,
            self.speed_limit,
            self.district,
            self.urban_rural,
            self.number_of_vehicles,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Translates a coded cell, counting values outside the domain.
fn coded<T: CodedLabel>(
    record: &StringRecord,
    position: Option<usize>,
    stats: &mut LoadStats,
) -> Option<T> {
    let outcome = parsing::parse_coded::<T>(cell(record, position));
    if let Coded::Unknown(code) = outcome {
        stats.unknown_codes += 1;
        log::debug!("Unknown {} code {code}; stored as absent", T::DOMAIN);
    }
    outcome.value()
}

/// Loads and cleans the collision file, keeping only rows whose district
/// code is in `districts`.
///
/// # Errors
///
/// Returns [`LoaderError`] if the file cannot be read or is not valid CSV.
pub fn load_primary(path: &Path, districts: &[String]) -> Result<Vec<Incident>, LoaderError> {
    load_primary_with_stats(path, districts, &null_progress()).map(|(incidents, _)| incidents)
}

/// Like [`load_primary`], also returning the row accounting and reporting
/// rows read to `progress`.
///
/// # Errors
///
/// Returns [`LoaderError`] if the file cannot be read or is not valid CSV.
pub fn load_primary_with_stats(
    path: &Path,
    districts: &[String],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(Vec<Incident>, LoadStats), LoaderError> {
    let csv_error = |source| LoaderError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let header = Header::new(reader.headers().map_err(csv_error)?);
    let columns = CollisionColumns::resolve(&header);
    let used = columns.used();
    let scope: BTreeSet<&str> = districts.iter().map(|d| d.trim()).collect();

    progress.set_message(format!("Loading collisions from {}", path.display()));

    let mut stats = LoadStats::default();
    let mut incidents = Vec::new();

    for result in reader.byte_records() {
        let raw = result.map_err(csv_error)?;
        stats.rows_read += 1;
        progress.inc(1);

        let Some(record) = decode(raw, &used) else {
            stats.dropped_malformed += 1;
            log::trace!("Row {}: invalid UTF-8", stats.rows_read);
            continue;
        };

        let Some(date) = parsing::parse_date(cell(&record, columns.date)) else {
            stats.dropped_date += 1;
            log::trace!("Row {}: unparseable date", stats.rows_read);
            continue;
        };

        let (Some(latitude), Some(longitude)) = (
            parsing::parse_coordinate(cell(&record, columns.latitude)),
            parsing::parse_coordinate(cell(&record, columns.longitude)),
        ) else {
            stats.dropped_coordinates += 1;
            log::trace!("Row {}: missing coordinates", stats.rows_read);
            continue;
        };

        let district_code = parsing::non_empty(cell(&record, columns.district))
            .unwrap_or_default()
            .to_string();
        if !scope.contains(district_code.as_str()) {
            stats.out_of_scope += 1;
            continue;
        }

        let road_class = coded(&record, columns.road_class, &mut stats);
        let road_type = coded(&record, columns.road_type, &mut stats);

        incidents.push(Incident {
            collision_index: cell(&record, columns.id)
                .unwrap_or_default()
                .trim()
                .to_string(),
            date,
            hour: parsing::parse_hour(cell(&record, columns.time)),
            year: date.year(),
            month: date.month(),
            weekday: date.weekday(),
            latitude,
            longitude,
            severity: coded(&record, columns.severity, &mut stats),
            weather: coded(&record, columns.weather, &mut stats),
            light: coded(&record, columns.light, &mut stats),
            surface: coded(&record, columns.surface, &mut stats),
            special_conditions: coded(&record, columns.special_conditions, &mut stats),
            road_class,
            road_type,
            display_road_type: parsing::display_road_type(road_class, road_type),
            speed_limit: parsing::parse_count(cell(&record, columns.speed_limit)),
            district: District::from_ons_code(&district_code).ok(),
            district_code,
            urban_rural: coded(&record, columns.urban_rural, &mut stats),
            number_of_vehicles: parsing::parse_count(cell(&record, columns.number_of_vehicles)),
        });
    }

    stats.retained = incidents.len() as u64;

    if stats.dropped_date > 0 || stats.dropped_coordinates > 0 {
        log::warn!(
            "Dropped {} rows with unparseable dates and {} rows without coordinates",
            stats.dropped_date,
            stats.dropped_coordinates
        );
    }
    if stats.dropped_malformed > 0 {
        log::warn!(
            "Dropped {} rows with undecodable text in {}",
            stats.dropped_malformed,
            path.display()
        );
    }
    if stats.unknown_codes > 0 {
        log::warn!(
            "{} coded values were outside their domain and stored as absent",
            stats.unknown_codes
        );
    }
    log::info!(
        "Loaded {} of {} collisions ({} outside the configured districts)",
        stats.retained,
        stats.rows_read,
        stats.out_of_scope
    );
    progress.finish(format!("{} collisions loaded", stats.retained));

    Ok((incidents, stats))
}

/// Collects the identifiers of `incidents`, for use with the linked
/// loaders.
#[must_use]
pub fn incident_ids(incidents: &[Incident]) -> BTreeSet<String> {
    incidents
        .iter()
        .map(|i| i.collision_index.clone())
        .collect()
}

/// Reads a linked file, keeping rows whose identifier is in `target_ids`.
/// `parse_row` receives the positions of `columns`, in order. Rows with
/// undecodable text in the identifier or one of `columns` are dropped.
fn read_linked<T>(
    path: &Path,
    target_ids: &BTreeSet<String>,
    columns: &[&str],
    mut parse_row: impl FnMut(&[Option<usize>], &StringRecord, String) -> T,
) -> Result<Vec<T>, LoaderError> {
    let csv_error = |source| LoaderError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let header = Header::new(reader.headers().map_err(csv_error)?);
    let id_position = header
        .id_position()
        .ok_or_else(|| LoaderError::MissingIdColumn {
            path: path.display().to_string(),
        })?;

    let positions: Vec<Option<usize>> = columns.iter().map(|c| header.position(c)).collect();
    let mut used: BTreeSet<usize> = positions.iter().flatten().copied().collect();
    used.insert(id_position);

    let mut rows = Vec::new();
    let mut dropped = 0_u64;
    for result in reader.byte_records() {
        let Some(record) = decode(result.map_err(csv_error)?, &used) else {
            dropped += 1;
            continue;
        };
        let Some(id) = record.get(id_position).map(str::trim) else {
            continue;
        };
        if target_ids.contains(id) {
            rows.push(parse_row(&positions, &record, id.to_string()));
        }
    }

    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} rows with undecodable text in {}",
            path.display()
        );
    }

    Ok(rows)
}

fn linked_or_empty<T>(label: &str, path: &Path, result: Result<Vec<T>, LoaderError>) -> Vec<T> {
    match result {
        Ok(rows) => {
            log::info!("Linked {} {label} records from {}", rows.len(), path.display());
            rows
        }
        Err(e) => {
            log::error!("Error loading {label} from {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Loads the vehicles belonging to `target_ids`. Returns an empty table
/// (and logs the failure) if the file cannot be read.
#[must_use]
pub fn load_vehicles(path: &Path, target_ids: &BTreeSet<String>) -> Vec<Vehicle> {
    let columns = ["sex_of_driver", "age_band_of_driver", "generic_make_model"];
    let result = read_linked(path, target_ids, &columns, |at, record, collision_index| {
        Vehicle {
            collision_index,
            driver_sex: parsing::parse_coded(cell(record, at[0])).value(),
            driver_age_band: parsing::parse_coded(cell(record, at[1])).value(),
            make_model: parsing::normalize_make_model(cell(record, at[2])),
        }
    });
    linked_or_empty("vehicle", path, result)
}

/// Loads the casualties belonging to `target_ids`. Returns an empty table
/// (and logs the failure) if the file cannot be read.
#[must_use]
pub fn load_casualties(path: &Path, target_ids: &BTreeSet<String>) -> Vec<Casualty> {
    let columns = ["sex_of_casualty", "age_band_of_casualty", "casualty_class"];
    let result = read_linked(path, target_ids, &columns, |at, record, collision_index| {
        Casualty {
            collision_index,
            sex: parsing::parse_coded(cell(record, at[0])).value(),
            age_band: parsing::parse_coded(cell(record, at[1])).value(),
            casualty_class: parsing::parse_coded(cell(record, at[2])).value(),
        }
    });
    linked_or_empty("casualty", path, result)
}

/// Describes the date range covered by `incidents`, e.g.
/// `"01, Jan, 2023 to 31, Dec, 2023"`.
#[must_use]
pub fn period_of(incidents: &[Incident]) -> String {
    let earliest = incidents.iter().map(|i| i.date).min();
    let latest = incidents.iter().map(|i| i.date).max();

    match (earliest, latest) {
        (Some(start), Some(end)) => format!(
            "{} to {}",
            start.format("%d, %b, %Y"),
            end.format("%d, %b, %Y")
        ),
        _ => UNKNOWN_PERIOD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use traffic_map_incident_models::{CasualtyClass, RoadClass, Severity, Sex};

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        write_bytes(dir, name, contents.as_bytes())
    }

    fn write_bytes(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    fn leeds() -> Vec<String> {
        vec!["E08000035".to_string()]
    }

    const COLLISIONS: &str = "\
collision_index,date,time,latitude,longitude,local_authority_ons_district,road_type,first_road_class,collision_severity
A1,2023-01-01,14:30,,-1.5,E08000035,3,1,2
B2,2023-01-02,06:15,53.9,-1.6,E08000035,6,3,3
C3,Invalid-Date,13:45,53.7,-1.7,E08000035,3,3,1
";

    #[test]
    fn drops_bad_dates_and_missing_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "collisions.csv", COLLISIONS);

        let (incidents, stats) = load_primary_with_stats(&path, &leeds(), &null_progress()).unwrap();

        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].collision_index, "B2");
        assert_eq!(incidents[0].hour, Some(6));
        assert_eq!(incidents[0].day_name(), "Monday");
        assert_eq!(incidents[0].display_road_type.as_deref(), Some("Single carriageway"));
        assert_eq!(incidents[0].severity, Some(Severity::Slight));
        assert_eq!(incidents[0].district, Some(District::Leeds));
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.dropped_date, 1);
        assert_eq!(stats.dropped_coordinates, 1);
        assert_eq!(stats.retained, 1);
    }

    #[test]
    fn motorway_rows_get_prefixed_display_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "collisions.csv",
            "collision_index,date,time,latitude,longitude,local_authority_ons_district,road_type,first_road_class\n\
             M1,2023-05-10,25:99,53.8,-1.5,E08000035,3,1\n\
             M2,2023-05-11,08:00,53.8,-1.5,E08000035,,1\n",
        );

        let incidents = load_primary(&path, &leeds()).unwrap();

        assert_eq!(incidents.len(), 2);
        assert_eq!(
            incidents[0].display_road_type.as_deref(),
            Some("Motorway(Dual carriageway)")
        );
        assert_eq!(incidents[0].hour, None);
        assert_eq!(incidents[0].road_class, Some(RoadClass::Motorway));
        assert_eq!(
            incidents[1].display_road_type.as_deref(),
            Some("Motorway(Unknown)")
        );
        assert!(incidents.iter().all(|i| i.hour.is_none_or(|h| h <= 23)));
    }

    #[test]
    fn scopes_to_configured_districts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "collisions.csv",
            "collision_index,date,latitude,longitude,local_authority_ons_district\n\
             A,2023-01-01,53.8,-1.5,E08000035\n\
             B,2023-01-01,53.4,-2.2,E08000003\n\
             C,2023-01-01,53.7,-1.8,E08000033\n",
        );

        let (incidents, stats) = load_primary_with_stats(
            &path,
            &District::all_ons_codes(),
            &null_progress(),
        )
        .unwrap();

        let ids: Vec<&str> = incidents.iter().map(|i| i.collision_index.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(stats.out_of_scope, 1);
    }

    #[test]
    fn unknown_codes_are_absent_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "collisions.csv",
            "collision_index,date,latitude,longitude,local_authority_ons_district,weather_conditions\n\
             A,2023-01-01,53.8,-1.5,E08000035,42\n",
        );

        let (incidents, stats) = load_primary_with_stats(&path, &leeds(), &null_progress()).unwrap();

        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].weather, None);
        assert_eq!(stats.unknown_codes, 1);
    }

    #[test]
    fn undecodable_rows_are_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bytes(
            &dir,
            "collisions.csv",
            b"collision_index,date,latitude,longitude,local_authority_ons_district,x\n\
A,2023-01-01,53.8,-1.5,E08000035,ok\n\
B,2023-01-02,53.8,-1.5,E08000035,\xff\n\
C,2023-01-03,53.8,-1.5,E0800\xff035,ok\n",
        );

        let (incidents, stats) = load_primary_with_stats(&path, &leeds(), &null_progress()).unwrap();

        let ids: Vec<&str> = incidents.iter().map(|i| i.collision_index.as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.dropped_malformed, 1);
        assert_eq!(stats.retained, 2);
    }

    #[test]
    fn unreadable_primary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_primary(&dir.path().join("missing.csv"), &leeds());
        assert!(matches!(result, Err(LoaderError::Csv { .. })));
    }

    #[test]
    fn linked_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ids = BTreeSet::from(["A".to_string()]);
        assert!(load_vehicles(&dir.path().join("missing.csv"), &ids).is_empty());
        assert!(load_casualties(&dir.path().join("missing.csv"), &ids).is_empty());
    }

    #[test]
    fn linked_rows_are_scoped_to_target_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "casualties.csv",
            "collision_index,sex_of_casualty,age_band_of_casualty,casualty_class\n\
             A,1,6,3\n\
             Z,2,4,1\n\
             A,2,99,2\n",
        );
        let ids = BTreeSet::from(["A".to_string()]);

        let casualties = load_casualties(&path, &ids);

        assert_eq!(casualties.len(), 2);
        assert_eq!(casualties[0].sex, Some(Sex::Male));
        assert_eq!(casualties[0].casualty_class, Some(CasualtyClass::Pedestrian));
        assert_eq!(casualties[1].age_band, None);
    }

    #[test]
    fn linked_accepts_legacy_identifier_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "vehicles.csv",
            "accident_index,sex_of_driver,age_band_of_driver,generic_make_model\n\
             A,1,5,FORD FIESTA\n\
             A,2,7,-1\n",
        );
        let ids = BTreeSet::from(["A".to_string()]);

        let vehicles = load_vehicles(&path, &ids);

        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].collision_index, "A");
        assert_eq!(vehicles[0].make_model.as_deref(), Some("FORD FIESTA"));
        assert_eq!(vehicles[1].make_model, None);
    }

    #[test]
    fn linked_undecodable_row_keeps_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bytes(
            &dir,
            "vehicles.csv",
            b"collision_index,sex_of_driver,age_band_of_driver,generic_make_model\n\
A,1,5,FORD FIESTA\n\
A,1,5,CITRO\xcbN C3\n\
A,2,7,VAUXHALL CORSA\n",
        );
        let ids = BTreeSet::from(["A".to_string()]);

        let vehicles = load_vehicles(&path, &ids);

        let makes: Vec<Option<&str>> = vehicles.iter().map(|v| v.make_model.as_deref()).collect();
        assert_eq!(makes, [Some("FORD FIESTA"), Some("VAUXHALL CORSA")]);
    }

    #[test]
    fn linked_without_id_column_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "vehicles.csv", "id,sex_of_driver\nA,1\n");
        let ids = BTreeSet::from(["A".to_string()]);
        assert!(load_vehicles(&path, &ids).is_empty());
    }

    #[test]
    fn period_covers_earliest_to_latest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "collisions.csv",
            "collision_index,date,latitude,longitude,local_authority_ons_district\n\
             A,31/12/2023,53.8,-1.5,E08000035\n\
             B,2023-01-01,53.8,-1.5,E08000035\n",
        );
        let incidents = load_primary(&path, &leeds()).unwrap();

        assert_eq!(period_of(&incidents), "01, Jan, 2023 to 31, Dec, 2023");
    }

    #[test]
    fn empty_period_is_unknown() {
        assert_eq!(period_of(&[]), UNKNOWN_PERIOD);
    }
}
