//! Loading of the three input tables and the reverse geocoder.

use std::collections::BTreeSet;

use traffic_map_cli_utils::{IndicatifProgress, MultiProgress};
use traffic_map_geocoder::{GeocodeError, Gazetteer};
use traffic_map_incident_models::{Casualty, Incident, Vehicle};
use traffic_map_loader::{LoaderError, incident_ids, load_casualties, load_vehicles};

use crate::config::Config;

/// The loaded tables, read once per session.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub incidents: Vec<Incident>,
    pub vehicles: Vec<Vehicle>,
    pub casualties: Vec<Casualty>,
}

impl Dataset {
    /// Reads the collision file, then the vehicles and casualties linked to
    /// the retained collisions.
    ///
    /// # Errors
    ///
    /// * If the collision file cannot be read
    pub fn load(config: &Config, multi: &MultiProgress) -> Result<Self, LoaderError> {
        let progress = IndicatifProgress::rows_bar(multi, "Loading collisions");
        let (incidents, stats) = traffic_map_loader::load_primary_with_stats(
            &config.data.accidents,
            &config.region.districts,
            &progress,
        )
        .inspect_err(|e| log::error!("No data loaded: {e}"))?;

        log::debug!("Load stats: {stats:?}");

        let ids = incident_ids(&incidents);
        let vehicles = load_vehicles(&config.data.vehicles, &ids);
        let casualties = load_casualties(&config.data.casualties, &ids);

        log::info!(
            "Loaded {} collisions, {} vehicles, {} casualties",
            incidents.len(),
            vehicles.len(),
            casualties.len()
        );

        Ok(Self {
            incidents,
            vehicles,
            casualties,
        })
    }

    /// A dataset of `incidents` with the linked rows that belong to them.
    #[must_use]
    pub fn restricted_to(&self, incidents: Vec<Incident>) -> Self {
        let ids: BTreeSet<&str> = incidents
            .iter()
            .map(|i| i.collision_index.as_str())
            .collect();

        Self {
            vehicles: self
                .vehicles
                .iter()
                .filter(|v| ids.contains(v.collision_index.as_str()))
                .cloned()
                .collect(),
            casualties: self
                .casualties
                .iter()
                .filter(|c| ids.contains(c.collision_index.as_str()))
                .cloned()
                .collect(),
            incidents,
        }
    }
}

/// The configured gazetteer, or the embedded one.
///
/// # Errors
///
/// * If the gazetteer file cannot be read or has no usable places
pub fn gazetteer(config: &Config) -> Result<Gazetteer, GeocodeError> {
    let gazetteer = match &config.geocoder.gazetteer {
        Some(path) => Gazetteer::from_path(path)?,
        None => Gazetteer::embedded()?,
    };
    log::debug!("Gazetteer has {} places", gazetteer.len());
    Ok(gazetteer)
}
