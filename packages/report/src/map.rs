//! Self-contained Leaflet map of incidents and blackspots.
//!
//! The page loads Leaflet and its marker cluster and heat plugins from a
//! CDN; all incident data is embedded in the page as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use traffic_map_analytics_models::Blackspot;
use traffic_map_incident_models::{Casualty, CodedLabel, Incident, RoadClass, Severity, Vehicle};

use crate::ReportError;

/// Default number of incident markers drawn on the map.
pub const DEFAULT_MARKER_LIMIT: usize = 2500;

/// How incident markers are coloured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerColoring {
    /// Fatal red, serious orange, slight yellow.
    #[default]
    Severity,
    /// Motorway red, every other road light blue.
    RoadClass,
}

/// Map rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Maximum number of incident markers.
    pub marker_limit: usize,
    /// Marker colouring scheme.
    pub coloring: MarkerColoring,
    /// Whether to overlay a density heat layer.
    pub heat_layer: bool,
    /// Legend heading.
    pub title: String,
    /// Initial map centre (latitude, longitude).
    pub center: (f64, f64),
    /// Initial zoom level.
    pub zoom: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            marker_limit: DEFAULT_MARKER_LIMIT,
            coloring: MarkerColoring::default(),
            heat_layer: false,
            title: "West Yorkshire Map Guide".to_string(),
            center: (53.8008, -1.5491),
            zoom: 10,
        }
    }
}

const MOTORWAY_COLOR: &str = "#ff4d4d";
const STANDARD_ROAD_COLOR: &str = "#4da6ff";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css">
<link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
<script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
#legend {
  position: fixed; bottom: 30px; left: 30px; width: 260px; z-index: 999999;
  background-color: rgba(40, 40, 40, 0.90); color: #f0f0f0; border: 2px solid #777;
  box-shadow: 4px 4px 15px rgba(0,0,0,0.5); font-size: 14px; padding: 15px;
  border-radius: 10px; font-family: Arial, sans-serif;
}
#legend hr { margin: 8px 0; border-color: #555; }
#legend .dot { font-size: 20px; vertical-align: middle; }
</style>
</head>
<body>
<div id="map"></div>
{{LEGEND}}
<script>
const map = L.map('map').setView([{{CENTER_LAT}}, {{CENTER_LON}}], {{ZOOM}});
L.tileLayer('https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png', {
  attribution: '&copy; OpenStreetMap contributors &copy; CARTO', maxZoom: 19
}).addTo(map);

const heat = {{HEAT}};
if (heat.length > 0) {
  L.heatLayer(heat, {radius: 20, blur: 20, minOpacity: 0.4, gradient: {0.4: 'blue', 0.65: 'lime', 1: 'red'}}).addTo(map);
}

const markers = {{MARKERS}};
if (markers.length > 0) {
  const cluster = L.markerClusterGroup();
  for (const m of markers) {
    L.circleMarker([m.lat, m.lon], {radius: 5, color: m.color, fill: true, fillColor: m.color, fillOpacity: 0.8})
      .bindPopup(m.popup, {maxWidth: 400})
      .bindTooltip('Click for details')
      .addTo(cluster);
  }
  map.addLayer(cluster);
}

const blackspots = {{BLACKSPOTS}};
for (const b of blackspots) {
  L.circleMarker([b.lat, b.lon], {radius: 12, color: '#CC0000', weight: 4, fill: true, fillColor: 'white', fillOpacity: 1.0})
    .bindPopup(b.popup, {maxWidth: 300})
    .bindTooltip(b.tooltip)
    .addTo(map);
}
</script>
</body>
</html>
"#;

/// Renders the incident map as a standalone HTML page.
///
/// At most `options.marker_limit` incidents get a clustered marker; the
/// heat layer, when enabled, covers every incident. An empty incident list
/// yields the base map alone.
#[must_use]
pub fn render_incident_map(
    incidents: &[Incident],
    vehicles: &[Vehicle],
    casualties: &[Casualty],
    blackspots: &[Blackspot],
    options: &MapOptions,
) -> String {
    let page = TEMPLATE
        .replace("{{TITLE}}", &escape_html(&options.title))
        .replace("{{CENTER_LAT}}", &options.center.0.to_string())
        .replace("{{CENTER_LON}}", &options.center.1.to_string())
        .replace("{{ZOOM}}", &options.zoom.to_string());

    if incidents.is_empty() {
        return page
            .replace("{{LEGEND}}", "")
            .replace("{{HEAT}}", "[]")
            .replace("{{MARKERS}}", "[]")
            .replace("{{BLACKSPOTS}}", "[]");
    }

    let heat = if options.heat_layer {
        Value::Array(
            incidents
                .iter()
                .map(|i| json!([i.latitude, i.longitude]))
                .collect(),
        )
    } else {
        json!([])
    };

    let vehicles_by_incident = index_by_incident(vehicles, |v| v.collision_index.as_str());
    let casualties_by_incident = index_by_incident(casualties, |c| c.collision_index.as_str());

    let markers: Vec<Value> = incidents
        .iter()
        .take(options.marker_limit)
        .map(|incident| {
            let id = incident.collision_index.as_str();
            let popup = incident_popup(
                incident,
                vehicles_by_incident.get(id).map_or(&[][..], Vec::as_slice),
                casualties_by_incident.get(id).map_or(&[][..], Vec::as_slice),
            );
            json!({
                "lat": incident.latitude,
                "lon": incident.longitude,
                "color": marker_color(incident, options.coloring),
                "popup": popup,
            })
        })
        .collect();

    let blackspot_markers: Vec<Value> = blackspots
        .iter()
        .enumerate()
        .map(|(index, spot)| {
            let rank = index + 1;
            json!({
                "lat": spot.latitude,
                "lon": spot.longitude,
                "popup": blackspot_popup(rank, spot),
                "tooltip": format!(
                    "Rank {rank}: {} ({} Incidents)",
                    escape_html(&spot.area),
                    spot.count
                ),
            })
        })
        .collect();

    log::debug!(
        "Map: {} markers, {} blackspots, heat layer {}",
        markers.len(),
        blackspot_markers.len(),
        if options.heat_layer { "on" } else { "off" }
    );

    page.replace("{{LEGEND}}", &legend(options, !blackspots.is_empty()))
        .replace("{{HEAT}}", &script_json(&heat))
        .replace("{{MARKERS}}", &script_json(&Value::Array(markers)))
        .replace("{{BLACKSPOTS}}", &script_json(&Value::Array(blackspot_markers)))
}

/// Renders the incident map and writes it to `path`.
///
/// # Errors
///
/// * If the file cannot be written
pub fn write_incident_map(
    incidents: &[Incident],
    vehicles: &[Vehicle],
    casualties: &[Casualty],
    blackspots: &[Blackspot],
    options: &MapOptions,
    path: &Path,
) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let html = render_incident_map(incidents, vehicles, casualties, blackspots, options);
    std::fs::write(path, html)?;
    log::info!("Map saved: {}", path.display());
    Ok(())
}

fn index_by_incident<'a, T>(
    rows: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> BTreeMap<&'a str, Vec<&'a T>> {
    let mut index: BTreeMap<&str, Vec<&T>> = BTreeMap::new();
    for row in rows {
        index.entry(key(row)).or_default().push(row);
    }
    index
}

fn marker_color(incident: &Incident, coloring: MarkerColoring) -> &'static str {
    match coloring {
        MarkerColoring::Severity => match incident.severity {
            Some(Severity::Fatal) => "red",
            Some(Severity::Serious) => "orange",
            _ => "yellow",
        },
        MarkerColoring::RoadClass => {
            if incident.road_class == Some(RoadClass::Motorway) {
                MOTORWAY_COLOR
            } else {
                STANDARD_ROAD_COLOR
            }
        }
    }
}

fn label_or<T: CodedLabel>(value: Option<T>, fallback: &'static str) -> &'static str {
    value.map_or(fallback, CodedLabel::label)
}

fn casualty_summary(casualties: &[&Casualty]) -> String {
    let details: BTreeSet<String> = casualties
        .iter()
        .map(|c| {
            format!(
                "{} ({})",
                label_or(c.sex, "Unknown"),
                label_or(c.age_band, "Age Unknown")
            )
        })
        .collect();
    if details.is_empty() {
        "Not Recorded".to_string()
    } else {
        details.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn vehicle_summary(vehicles: &[&Vehicle]) -> String {
    let makes: BTreeSet<&str> = vehicles
        .iter()
        .map(|v| v.make_model.as_deref().unwrap_or("Unknown Make"))
        .collect();
    if makes.is_empty() {
        "Unknown Vehicle".to_string()
    } else {
        makes.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn incident_popup(incident: &Incident, vehicles: &[&Vehicle], casualties: &[&Casualty]) -> String {
    let road = incident
        .display_road_type
        .clone()
        .unwrap_or_else(|| label_or(incident.road_type, "Unknown").to_string());
    let involved = incident
        .number_of_vehicles
        .map_or_else(|| "Unknown".to_string(), |n| n.to_string());

    format!(
        r#"<div style="font-family: Arial; font-size: 13px; width: 230px;">
<h4 style="margin:0 0 10px 0; color: #e74c3c; border-bottom: 1px solid #ccc;">{severity} Incident</h4>
<b>Date:</b> {date}<br>
<b>Location:</b> {area} Area<br>
<b>Road Type:</b> {road}<br>
<hr style="margin: 8px 0;">
<b>Conditions:</b><br>
{weather}<br>
{light}<br>
{surface} Surface<br>
{special}<br>
<hr style="margin: 8px 0;">
<b>Involved:</b> {involved} Vehicles<br>
<b>Casualties:</b> {casualties}<br>
<b>Vehicle:</b> {vehicles}<br>
</div>"#,
        severity = label_or(incident.severity, "Unknown"),
        date = incident.date.format("%d %b %Y"),
        area = label_or(incident.urban_rural, "Unknown"),
        road = escape_html(&road),
        weather = label_or(incident.weather, "Unknown"),
        light = label_or(incident.light, "Unknown"),
        surface = label_or(incident.surface, "Unknown"),
        special = label_or(incident.special_conditions, "Unknown"),
        casualties = escape_html(&casualty_summary(casualties)),
        vehicles = escape_html(&vehicle_summary(vehicles)),
    )
}

fn blackspot_popup(rank: usize, spot: &Blackspot) -> String {
    let description = if rank <= 3 {
        "CRITICAL HAZARD"
    } else {
        "High Risk Area"
    };
    format!(
        r#"<div style="font-family: Arial; width: 200px;">
<b style="color: #CC0000;">RANK {rank}: {description}</b><br><br>
<b>Location:</b><br>{area}<br><br>
<b>Road Type:</b> {road}<br>
<b>Incidents:</b> {count}<br><br>
<small style="color: #666;">GPS: {lat}, {lon}</small>
</div>"#,
        area = escape_html(&spot.area),
        road = escape_html(&spot.road_type),
        count = spot.count,
        lat = spot.latitude,
        lon = spot.longitude,
    )
}

fn legend(options: &MapOptions, has_blackspots: bool) -> String {
    let markers = match options.coloring {
        MarkerColoring::Severity => {
            "<b>Severity (Zoomed In)</b><br>\n\
             <span class=\"dot\" style=\"color:red\">&#9679;</span> Fatal<br>\n\
             <span class=\"dot\" style=\"color:orange\">&#9679;</span> Serious<br>\n\
             <span class=\"dot\" style=\"color:yellow\">&#9679;</span> Slight"
                .to_string()
        }
        MarkerColoring::RoadClass => format!(
            "<b>Road Type (Zoomed In)</b><br>\n\
             <span class=\"dot\" style=\"color:{STANDARD_ROAD_COLOR}\">&#9679;</span> Standard Road<br>\n\
             <span class=\"dot\" style=\"color:{MOTORWAY_COLOR}\">&#9679;</span> Motorway"
        ),
    };
    let blackspots = if has_blackspots {
        "<hr>\n<span class=\"dot\" style=\"color:#CC0000\">&#9711;</span> Priority Blackspot"
    } else {
        ""
    };

    format!(
        "<div id=\"legend\">\n<b style=\"font-size: 16px;\">{title}</b><br>\n<hr>\n\
         <b>Cluster Volume (Density)</b><br>\n\
         <span class=\"dot\" style=\"color:#50c878\">&#9679;</span> Low volume (&lt;10)<br>\n\
         <span class=\"dot\" style=\"color:gold\">&#9679;</span> Medium volume (10-99)<br>\n\
         <span class=\"dot\" style=\"color:orange\">&#9679;</span> High volume (100+)\n\
         <hr>\n{markers}\n{blackspots}\n</div>",
        title = escape_html(&options.title),
    )
}

/// JSON safe to embed inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};
    use traffic_map_incident_models::{AgeBand, District, Sex, UrbanRural, Weather};

    use super::*;

    fn incident(id: &str, severity: Severity) -> Incident {
        let date = NaiveDate::from_ymd_opt(2023, 3, 9).unwrap();
        Incident {
            collision_index: id.to_string(),
            date,
            hour: Some(17),
            year: date.year(),
            month: date.month(),
            weekday: date.weekday(),
            latitude: 53.8,
            longitude: -1.55,
            severity: Some(severity),
            weather: Some(Weather::Fine),
            light: None,
            surface: None,
            special_conditions: None,
            road_class: Some(RoadClass::Motorway),
            road_type: None,
            display_road_type: Some("Motorway(Dual carriageway)".to_string()),
            speed_limit: Some(70),
            district_code: District::Leeds.ons_code().to_string(),
            district: Some(District::Leeds),
            urban_rural: Some(UrbanRural::Urban),
            number_of_vehicles: Some(2),
        }
    }

    fn blackspot(count: u64) -> Blackspot {
        Blackspot {
            latitude: 53.8,
            longitude: -1.55,
            count,
            area: "Leeds".to_string(),
            site_label: "Site @ 53.8, -1.55 (Leeds)".to_string(),
            road_type: "Roundabout".to_string(),
        }
    }

    #[test]
    fn empty_incidents_render_base_map_only() {
        let html = render_incident_map(&[], &[], &[], &[blackspot(4)], &MapOptions::default());

        assert!(html.contains("L.tileLayer"));
        assert!(html.contains("const markers = [];"));
        assert!(html.contains("const blackspots = [];"));
        assert!(!html.contains("id=\"legend\""));
    }

    #[test]
    fn marker_limit_caps_markers_but_not_heat() {
        let incidents: Vec<Incident> = (0..5)
            .map(|n| incident(&n.to_string(), Severity::Slight))
            .collect();
        let options = MapOptions {
            marker_limit: 2,
            heat_layer: true,
            ..MapOptions::default()
        };

        let html = render_incident_map(&incidents, &[], &[], &[], &options);

        assert_eq!(html.matches("\"popup\"").count(), 2);
        assert_eq!(html.matches("[53.8,-1.55]").count(), 5);
    }

    #[test]
    fn popup_lists_linked_rows_once() {
        let vehicle = Vehicle {
            collision_index: "1".to_string(),
            driver_sex: None,
            driver_age_band: None,
            make_model: Some("FORD FIESTA".to_string()),
        };
        let vehicles = vec![vehicle.clone(), vehicle];
        let casualty = Casualty {
            collision_index: "1".to_string(),
            sex: Some(Sex::Female),
            age_band: Some(AgeBand::From26To35),
            casualty_class: None,
        };
        let refs_v: Vec<&Vehicle> = vehicles.iter().collect();

        let popup = incident_popup(&incident("1", Severity::Fatal), &refs_v, &[&casualty, &casualty]);

        assert!(popup.contains("Fatal Incident"));
        assert!(popup.contains("<b>Date:</b> 09 Mar 2023"));
        assert!(popup.contains("Urban Area"));
        assert_eq!(popup.matches("FORD FIESTA").count(), 1);
        assert!(popup.contains("Female (26-35)"));
        assert!(popup.contains("<b>Involved:</b> 2 Vehicles"));
    }

    #[test]
    fn popup_without_linked_rows() {
        let popup = incident_popup(&incident("1", Severity::Slight), &[], &[]);

        assert!(popup.contains("<b>Casualties:</b> Not Recorded"));
        assert!(popup.contains("<b>Vehicle:</b> Unknown Vehicle"));
    }

    #[test]
    fn marker_colors() {
        let fatal = incident("1", Severity::Fatal);
        let mut slight = incident("2", Severity::Slight);
        slight.road_class = Some(RoadClass::A);

        assert_eq!(marker_color(&fatal, MarkerColoring::Severity), "red");
        assert_eq!(marker_color(&slight, MarkerColoring::Severity), "yellow");
        assert_eq!(marker_color(&fatal, MarkerColoring::RoadClass), MOTORWAY_COLOR);
        assert_eq!(marker_color(&slight, MarkerColoring::RoadClass), STANDARD_ROAD_COLOR);
    }

    #[test]
    fn top_three_blackspots_are_critical() {
        let spots: Vec<Blackspot> = (0..5).map(|n| blackspot(10 - n)).collect();

        let html = render_incident_map(
            &[incident("1", Severity::Slight)],
            &[],
            &[],
            &spots,
            &MapOptions::default(),
        );

        assert_eq!(html.matches("CRITICAL HAZARD").count(), 3);
        assert_eq!(html.matches("High Risk Area").count(), 2);
        assert!(html.contains("Rank 1: Leeds (10 Incidents)"));
        assert!(html.contains("Priority Blackspot"));
    }

    #[test]
    fn embedded_json_cannot_close_the_script() {
        let mut spot = blackspot(3);
        spot.area = "</script><b>".to_string();

        let html = render_incident_map(
            &[incident("1", Severity::Slight)],
            &[],
            &[],
            &[spot],
            &MapOptions::default(),
        );

        // Three CDN scripts plus the inline one.
        assert_eq!(html.matches("</script>").count(), 4);
    }
}
