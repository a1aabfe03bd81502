//! Accident blackspot identification.
//!
//! Incidents are snapped to a grid by rounding both coordinates to three
//! decimal places (about 111 m of latitude), grid cells are ranked by
//! incident count, and the top cells are annotated with the nearest area
//! name and the most common road type in the cell.

use std::collections::BTreeMap;

use traffic_map_analytics_models::Blackspot;
use traffic_map_geocoder::ReverseGeocoder;
use traffic_map_incident_models::Incident;

use crate::aggregate;

/// Area shown when the reverse geocoder cannot resolve a cell.
pub const LOOKUP_FAILED: &str = "Area Lookup Failed";

/// Road type shown when no incident in a cell has one.
pub const UNKNOWN_ROAD_TYPE: &str = "Unknown";

const GRID_SCALE: f64 = 1000.0;

/// A grid cell key: coordinates scaled by 1000 and rounded half-to-even.
type CellKey = (i64, i64);

#[allow(clippy::cast_possible_truncation)]
fn grid_index(value: f64) -> i64 {
    (value * GRID_SCALE).round_ties_even() as i64
}

#[allow(clippy::cast_precision_loss)]
fn grid_value(index: i64) -> f64 {
    index as f64 / GRID_SCALE
}

/// Ranks grid cells by incident count and annotates the top `top_n`.
///
/// Cells with equal counts are ordered by latitude, then longitude. Cells
/// whose count is below `min_count` are dropped after the top-N cut, so the
/// result can be shorter than `top_n`.
#[must_use]
pub fn identify_blackspots(
    incidents: &[Incident],
    geocoder: &dyn ReverseGeocoder,
    top_n: usize,
    min_count: u64,
) -> Vec<Blackspot> {
    let mut cells: BTreeMap<CellKey, Vec<&Incident>> = BTreeMap::new();
    for incident in incidents {
        let key = (grid_index(incident.latitude), grid_index(incident.longitude));
        cells.entry(key).or_default().push(incident);
    }

    let mut ranked: Vec<(CellKey, Vec<&Incident>)> = cells.into_iter().collect();
    // Stable sort keeps the (lat, lon) order among equal counts.
    ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    log::debug!(
        "{} incidents fall into {} grid cells",
        incidents.len(),
        ranked.len()
    );

    ranked
        .into_iter()
        .take(top_n)
        .map(|((lat_index, lon_index), members)| {
            let latitude = grid_value(lat_index);
            let longitude = grid_value(lon_index);
            let area = resolve_area(geocoder, latitude, longitude);
            let road_type = aggregate::mode(
                members
                    .iter()
                    .filter_map(|i| i.display_road_type.as_deref()),
            )
            .unwrap_or(UNKNOWN_ROAD_TYPE)
            .to_string();

            Blackspot {
                latitude,
                longitude,
                count: members.len() as u64,
                site_label: format!("Site @ {latitude}, {longitude} ({area})"),
                area,
                road_type,
            }
        })
        .filter(|spot| spot.count >= min_count)
        .collect()
}

fn resolve_area(geocoder: &dyn ReverseGeocoder, latitude: f64, longitude: f64) -> String {
    match geocoder.lookup(latitude, longitude) {
        Ok(place) if !place.admin2.is_empty() => place.admin2,
        Ok(place) => place.name,
        Err(e) => {
            log::warn!("Area lookup failed for ({latitude}, {longitude}): {e}");
            LOOKUP_FAILED.to_string()
        }
    }
}
