//! Field-level parsing for the collision data files.
//!
//! Every function here takes the raw text of one CSV cell and returns
//! `None` when the value is missing or malformed; the loader decides
//! whether that drops the row or just leaves the field absent.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use traffic_map_incident_models::{CodedLabel, RoadClass, RoadType};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Returns the trimmed cell text, or `None` for empty and `NULL` cells.
#[must_use]
pub fn non_empty(raw: Option<&str>) -> Option<&str> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(value)
    }
}

/// Parses a collision date in any of the accepted formats.
#[must_use]
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let value = non_empty(raw)?;

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Parses a time-of-day cell (`HH:MM` or `HH:MM:SS`) into an hour in
/// `0..=23`.
#[must_use]
pub fn parse_hour(raw: Option<&str>) -> Option<u32> {
    let value = non_empty(raw)?;
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .map(|t| t.hour())
}

/// Parses a coordinate. Non-numeric and non-finite values are rejected.
#[must_use]
pub fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    let value = non_empty(raw)?.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a numeric code. Integral floats such as `"3.0"` are accepted
/// since spreadsheet exports often write codes that way.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_code(raw: Option<&str>) -> Option<i32> {
    let value = non_empty(raw)?;
    if let Ok(code) = value.parse::<i32>() {
        return Some(code);
    }
    let float = value.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() <= f64::from(i32::MAX) {
        Some(float as i32)
    } else {
        None
    }
}

/// Parses a non-negative count or limit (e.g. speed limit, vehicle count).
#[must_use]
pub fn parse_count(raw: Option<&str>) -> Option<u32> {
    parse_code(raw).and_then(|v| u32::try_from(v).ok())
}

/// Outcome of translating a coded cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coded<T> {
    /// The cell held a code from the domain.
    Known(T),
    /// The cell was empty.
    Missing,
    /// The cell held a code outside the domain.
    Unknown(i32),
}

impl<T> Coded<T> {
    /// Collapses the outcome to an optional value.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Missing | Self::Unknown(_) => None,
        }
    }
}

/// Translates a coded cell into its domain enum.
#[must_use]
pub fn parse_coded<T: CodedLabel>(raw: Option<&str>) -> Coded<T> {
    match parse_code(raw) {
        None => Coded::Missing,
        Some(code) => T::from_code(code).map_or(Coded::Unknown(code), Coded::Known),
    }
}

/// Builds the display road type for a collision.
///
/// Motorway-class roads read `"Motorway(<type>)"`, with `Unknown` standing
/// in for a missing type; every other class uses the bare type label.
#[must_use]
pub fn display_road_type(
    road_class: Option<RoadClass>,
    road_type: Option<RoadType>,
) -> Option<String> {
    if road_class == Some(RoadClass::Motorway) {
        let label = road_type.map_or("Unknown", CodedLabel::label);
        Some(format!("Motorway({label})"))
    } else {
        road_type.map(|t| t.label().to_string())
    }
}

/// Normalises a make/model cell; `-1` and blank values are absent.
#[must_use]
pub fn normalize_make_model(raw: Option<&str>) -> Option<String> {
    non_empty(raw)
        .filter(|v| *v != "-1")
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_map_incident_models::Weather;

    #[test]
    fn parses_all_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 14).unwrap();
        assert_eq!(parse_date(Some("2023-03-14")), Some(expected));
        assert_eq!(parse_date(Some("14/03/2023")), Some(expected));
        assert_eq!(parse_date(Some("2023-03-14 08:15:00")), Some(expected));
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(parse_date(Some("Invalid-Date")).is_none());
        assert!(parse_date(Some("2023-02-30")).is_none());
        assert!(parse_date(Some("")).is_none());
        assert!(parse_date(None).is_none());
    }

    #[test]
    fn parses_hours() {
        assert_eq!(parse_hour(Some("14:30")), Some(14));
        assert_eq!(parse_hour(Some("00:05:59")), Some(0));
        assert_eq!(parse_hour(Some("23:59")), Some(23));
        assert!(parse_hour(Some("25:00")).is_none());
        assert!(parse_hour(Some("noon")).is_none());
    }

    #[test]
    fn coordinates_reject_null_and_non_finite() {
        assert_eq!(parse_coordinate(Some(" 53.8 ")), Some(53.8));
        assert!(parse_coordinate(Some("NULL")).is_none());
        assert!(parse_coordinate(Some("NaN")).is_none());
        assert!(parse_coordinate(Some("inf")).is_none());
        assert!(parse_coordinate(Some("north")).is_none());
    }

    #[test]
    fn codes_accept_integral_floats() {
        assert_eq!(parse_code(Some("3")), Some(3));
        assert_eq!(parse_code(Some("3.0")), Some(3));
        assert_eq!(parse_code(Some("-1")), Some(-1));
        assert!(parse_code(Some("3.5")).is_none());
    }

    #[test]
    fn coded_distinguishes_missing_from_unknown() {
        assert_eq!(parse_coded::<Weather>(Some("7")), Coded::Known(Weather::FogOrMist));
        assert_eq!(parse_coded::<Weather>(Some("")), Coded::Missing);
        assert_eq!(parse_coded::<Weather>(Some("42")), Coded::Unknown(42));
        assert_eq!(parse_coded::<Weather>(Some("42")).value(), None);
    }

    #[test]
    fn motorway_display_road_type() {
        assert_eq!(
            display_road_type(Some(RoadClass::Motorway), Some(RoadType::DualCarriageway)),
            Some("Motorway(Dual carriageway)".to_string())
        );
        assert_eq!(
            display_road_type(Some(RoadClass::Motorway), None),
            Some("Motorway(Unknown)".to_string())
        );
        assert_eq!(
            display_road_type(Some(RoadClass::A), Some(RoadType::Roundabout)),
            Some("Roundabout".to_string())
        );
        assert_eq!(display_road_type(Some(RoadClass::B), None), None);
    }

    #[test]
    fn make_model_sentinel_is_absent() {
        assert_eq!(normalize_make_model(Some("-1")), None);
        assert_eq!(normalize_make_model(Some("  ")), None);
        assert_eq!(
            normalize_make_model(Some("FORD FIESTA")),
            Some("FORD FIESTA".to_string())
        );
    }
}
