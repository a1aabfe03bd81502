//! GeoJSON export of ranked blackspots.

use std::path::Path;

use ::geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use traffic_map_analytics_models::Blackspot;

use crate::ReportError;

/// File name of the blackspot export.
pub const BLACKSPOTS_FILE: &str = "blackspots.geojson";

/// Builds a point feature per blackspot, in rank order.
#[must_use]
pub fn blackspot_features(blackspots: &[Blackspot]) -> FeatureCollection {
    let features = blackspots
        .iter()
        .enumerate()
        .map(|(index, spot)| {
            let mut properties = JsonObject::new();
            properties.insert("rank".to_string(), (index + 1).into());
            properties.insert("count".to_string(), spot.count.into());
            properties.insert("area".to_string(), spot.area.clone().into());
            properties.insert("siteLabel".to_string(), spot.site_label.clone().into());
            properties.insert("roadType".to_string(), spot.road_type.clone().into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    spot.longitude,
                    spot.latitude,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes the blackspot feature collection to `path`.
///
/// # Errors
///
/// * If serialization fails
/// * If the file cannot be written
pub fn write_blackspots_geojson(blackspots: &[Blackspot], path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&blackspot_features(blackspots))?;
    std::fs::write(path, json)?;
    log::info!("Wrote {} blackspots to {}", blackspots.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use ::geojson::GeoJson;

    use super::*;

    #[test]
    fn blackspots_become_lon_lat_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BLACKSPOTS_FILE);
        let spot = Blackspot {
            latitude: 53.646,
            longitude: -1.785,
            count: 4,
            area: "Kirklees".to_string(),
            site_label: "Site @ 53.646, -1.785 (Kirklees)".to_string(),
            road_type: "Roundabout".to_string(),
        };

        write_blackspots_geojson(&[spot], &path).unwrap();

        let parsed: GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        let GeoJson::FeatureCollection(collection) = parsed else {
            panic!("expected a feature collection");
        };
        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(
            feature.geometry.as_ref().map(|g| g.value.clone()),
            Some(Value::Point(vec![-1.785, 53.646]))
        );
        assert_eq!(feature.property("area").and_then(|v| v.as_str()), Some("Kirklees"));
        assert_eq!(feature.property("count").and_then(serde_json::Value::as_u64), Some(4));
        assert_eq!(feature.property("rank").and_then(serde_json::Value::as_u64), Some(1));
    }

    #[test]
    fn no_blackspots_is_an_empty_collection() {
        assert!(blackspot_features(&[]).features.is_empty());
    }
}
