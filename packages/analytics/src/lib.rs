#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics over loaded traffic incidents.
//!
//! Everything here is a pure function over in-memory tables:
//!
//! - [`blackspots`] ranks ~111 m grid cells by incident count and
//!   annotates the top cells with an area name and dominant road type.
//! - [`filters`] narrows incidents by label-based criteria, joining
//!   against casualties for the casualty-level criteria.
//! - [`suites`] builds the chart series for the batch report.
//! - [`summary`] builds the headline summary and dashboard metrics.

pub mod aggregate;
pub mod blackspots;
pub mod filters;
pub mod suites;
pub mod summary;

pub use blackspots::identify_blackspots;
pub use filters::{FilterError, apply_filters, incidents_in_year, visible_incidents};
pub use summary::{comprehensive_summary, dashboard_metrics};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Datelike, NaiveDate};
    use traffic_map_incident_models::{Casualty, District, Incident, Vehicle};

    /// A Leeds incident on 2023-06-15 with no coded fields set.
    pub fn incident(id: &str, latitude: f64, longitude: f64) -> Incident {
        let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
        Incident {
            collision_index: id.to_string(),
            date,
            hour: Some(8),
            year: date.year(),
            month: date.month(),
            weekday: date.weekday(),
            latitude,
            longitude,
            severity: None,
            weather: None,
            light: None,
            surface: None,
            special_conditions: None,
            road_class: None,
            road_type: None,
            display_road_type: None,
            speed_limit: None,
            district_code: District::Leeds.ons_code().to_string(),
            district: Some(District::Leeds),
            urban_rural: None,
            number_of_vehicles: None,
        }
    }

    pub fn casualty(id: &str) -> Casualty {
        Casualty {
            collision_index: id.to_string(),
            sex: None,
            age_band: None,
            casualty_class: None,
        }
    }

    pub fn vehicle(id: &str, make_model: Option<&str>) -> Vehicle {
        Vehicle {
            collision_index: id.to_string(),
            driver_sex: None,
            driver_age_band: None,
            make_model: make_model.map(ToString::to_string),
        }
    }
}
