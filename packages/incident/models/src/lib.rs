#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic incident record types and code domains.
//!
//! This crate defines the cleaned, in-memory representation of the three
//! related road-safety datasets (collisions, vehicles, casualties) and the
//! closed code domains used to translate their numeric columns into
//! human-readable labels. All other crates in the workspace share these
//! types.

pub mod codes;
pub mod district;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub use codes::{
    AgeBand, CasualtyClass, CodedLabel, LightCondition, RoadClass, RoadSurface, RoadType, Severity,
    Sex, SpecialConditions, UnknownCodeError, UnknownLabelError, UrbanRural, Weather,
};
pub use district::{District, UnknownDistrictError};

/// Canonical name of the identifier column shared by all three files.
pub const INCIDENT_ID_COLUMN: &str = "collision_index";

/// Legacy name of the identifier column, accepted by the loaders.
pub const LEGACY_INCIDENT_ID_COLUMN: &str = "accident_index";

/// A single cleaned traffic collision.
///
/// Every incident has a parsed date and finite coordinates; coded columns
/// whose value was missing or outside its domain are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique collision identifier.
    pub collision_index: String,
    /// Date of the collision.
    pub date: NaiveDate,
    /// Hour of day (0-23), if the time column parsed.
    pub hour: Option<u32>,
    /// Calendar year derived from [`Self::date`].
    pub year: i32,
    /// Calendar month (1-12) derived from [`Self::date`].
    pub month: u32,
    /// Day of week derived from [`Self::date`].
    pub weekday: Weekday,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Collision severity.
    pub severity: Option<Severity>,
    /// Weather conditions.
    pub weather: Option<Weather>,
    /// Light conditions.
    pub light: Option<LightCondition>,
    /// Road surface conditions.
    pub surface: Option<RoadSurface>,
    /// Special conditions at the site.
    pub special_conditions: Option<SpecialConditions>,
    /// Class of the first road.
    pub road_class: Option<RoadClass>,
    /// Layout of the road.
    pub road_type: Option<RoadType>,
    /// Derived label combining road class and road type, e.g.
    /// `"Motorway(Dual carriageway)"` or `"Roundabout"`.
    pub display_road_type: Option<String>,
    /// Speed limit in mph.
    pub speed_limit: Option<u32>,
    /// ONS local authority district code as it appears in the file.
    pub district_code: String,
    /// Resolved district, when the code is a known one.
    pub district: Option<District>,
    /// Urban or rural area.
    pub urban_rural: Option<UrbanRural>,
    /// Number of vehicles involved.
    pub number_of_vehicles: Option<u32>,
}

impl Incident {
    /// Returns the English weekday name (e.g. `"Monday"`).
    #[must_use]
    pub const fn day_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    /// Whether the first road is a motorway.
    #[must_use]
    pub fn is_motorway(&self) -> bool {
        self.road_class == Some(RoadClass::Motorway)
    }
}

/// A vehicle involved in an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Identifier of the incident this vehicle belongs to.
    pub collision_index: String,
    /// Sex of the driver.
    pub driver_sex: Option<Sex>,
    /// Age band of the driver.
    pub driver_age_band: Option<AgeBand>,
    /// Generic make and model, e.g. `"FORD FIESTA"`.
    pub make_model: Option<String>,
}

/// A person injured or killed in an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Casualty {
    /// Identifier of the incident this casualty belongs to.
    pub collision_index: String,
    /// Sex of the casualty.
    pub sex: Option<Sex>,
    /// Age band of the casualty.
    pub age_band: Option<AgeBand>,
    /// Driver, passenger or pedestrian.
    pub casualty_class: Option<CasualtyClass>,
}

/// Every weekday in calendar order, starting on Monday.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Maps a [`Weekday`] to its full English name.
#[must_use]
pub const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
