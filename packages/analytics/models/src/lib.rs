#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types shared by the analytics engine and its renderers.
//!
//! The analytics crate produces these values; the report crate turns them
//! into images, PDF pages and map layers, and the CLI prints them.

use serde::{Deserialize, Serialize};

/// Count of incidents sharing one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Display label (e.g. `"Fine (no high winds)"`).
    pub label: String,
    /// Number of incidents.
    pub count: u64,
}

impl CategoryCount {
    /// Creates a count for `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// A ranked accident blackspot: a ~111 m grid cell with repeated incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blackspot {
    /// Latitude rounded to 3 decimal places.
    pub latitude: f64,
    /// Longitude rounded to 3 decimal places.
    pub longitude: f64,
    /// Number of incidents in the cell.
    pub count: u64,
    /// Area name from the reverse geocoder, or a lookup-failed placeholder.
    pub area: String,
    /// Display label, e.g. `"Site @ 53.8, -1.5 (Leeds)"`.
    pub site_label: String,
    /// Most frequent display road type in the cell.
    pub road_type: String,
}

impl Blackspot {
    /// Google Maps search link for the cell.
    #[must_use]
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }
}

/// User-selected filters, each a list of human-readable labels.
///
/// An empty list means the criterion is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FilterCriteria {
    /// Collision severity labels.
    pub severity: Vec<String>,
    /// Casualty sex labels.
    pub gender: Vec<String>,
    /// Casualty age band labels.
    pub age_band: Vec<String>,
    /// Weather labels.
    pub weather: Vec<String>,
    /// Light condition labels.
    pub light: Vec<String>,
    /// Road surface labels.
    pub surface: Vec<String>,
    /// Road type labels (matched against the display road type).
    pub road_type: Vec<String>,
}

impl FilterCriteria {
    /// Whether no criterion is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.severity.is_empty()
            && self.gender.is_empty()
            && self.age_band.is_empty()
            && self.weather.is_empty()
            && self.light.is_empty()
            && self.surface.is_empty()
            && self.road_type.is_empty()
    }
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Hex notation, e.g. `"#e74c3c"`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// One series of a stacked bar chart, aligned with the chart categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackedSeries {
    /// Legend entry (e.g. `"Fatal"`).
    pub name: String,
    /// Fill colour.
    pub color: Rgb,
    /// One count per category.
    pub counts: Vec<u64>,
}

/// The data and geometry of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Chart {
    /// Vertical bars in series order.
    Bar {
        /// Bars, left to right.
        counts: Vec<CategoryCount>,
        /// Bar colour.
        color: Rgb,
    },
    /// A pie with percentage labels.
    Pie {
        /// Slices, clockwise from the top.
        counts: Vec<CategoryCount>,
        /// Slice colours, cycled when there are more slices than colours.
        colors: Vec<Rgb>,
    },
    /// Vertical bars stacked by series.
    StackedBar {
        /// Category labels along the x axis.
        categories: Vec<String>,
        /// Stacked series, bottom to top.
        series: Vec<StackedSeries>,
        /// Legend title (e.g. `"Severity"`).
        legend_title: String,
    },
}

/// A chart ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    /// Chart title; also determines the output file name.
    pub title: String,
    /// X axis label.
    pub x_label: String,
    /// Y axis label.
    pub y_label: String,
    /// Chart data.
    pub chart: Chart,
}

impl ChartSpec {
    /// Whether the chart has nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.chart {
            Chart::Bar { counts, .. } | Chart::Pie { counts, .. } => {
                counts.iter().all(|c| c.count == 0)
            }
            Chart::StackedBar { series, .. } => series
                .iter()
                .all(|s| s.counts.iter().all(|&count| count == 0)),
        }
    }
}

/// Headline figures for the filtered dashboard view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Visible incidents.
    pub total_incidents: u64,
    /// Most common severity label, if any incident is visible.
    pub most_common_severity: Option<String>,
    /// Most common district name, if any incident is visible.
    pub most_common_district: Option<String>,
    /// Vehicles linked to the visible incidents.
    pub total_vehicles: u64,
    /// Casualties linked to the visible incidents.
    pub total_casualties: u64,
}

/// The comprehensive summary printed at the top of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Incidents analysed.
    pub total: u64,
    /// Incidents on motorway-class roads.
    pub motorway_count: u64,
    /// Motorway incidents as a percentage of the total.
    pub motorway_pct: f64,
    /// Most common driver sex label.
    pub primary_driver_gender: Option<String>,
    /// Most common vehicle make/model.
    pub most_frequent_vehicle: Option<String>,
    /// Most common weather label.
    pub predominant_weather: Option<String>,
    /// Most common light condition label.
    pub predominant_light: Option<String>,
    /// Incidents per severity, most frequent first.
    pub severity_counts: Vec<CategoryCount>,
    /// Fatal and serious incidents as a percentage of the total.
    pub hazard_score: f64,
}

const UNKNOWN: &str = "Unknown";

impl Summary {
    /// Renders the summary as the ordered report lines. Empty strings are
    /// paragraph breaks.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let or_unknown = |value: &Option<String>| value.as_deref().unwrap_or(UNKNOWN).to_string();

        let mut lines = vec![
            format!("TOTAL DATASET: {} records analyzed.", self.total),
            format!(
                "MOTORWAY SCOPE: {} incidents ({:.1}% of total).",
                self.motorway_count, self.motorway_pct
            ),
            String::new(),
            "PROFILED RISK GROUPS:".to_string(),
            format!(
                " - Primary Driver Gender: {}",
                or_unknown(&self.primary_driver_gender)
            ),
            format!(
                " - Most Frequent Vehicle: {}",
                or_unknown(&self.most_frequent_vehicle)
            ),
            String::new(),
            "ENVIRONMENTAL PROFILE:".to_string(),
            format!(
                " - Predominant Weather: {}",
                or_unknown(&self.predominant_weather)
            ),
            format!(
                " - Predominant Lighting: {}",
                or_unknown(&self.predominant_light)
            ),
            String::new(),
            "SEVERITY RISK:".to_string(),
        ];
        lines.extend(
            self.severity_counts
                .iter()
                .map(|c| format!(" - {}: {}", c.label, c.count)),
        );
        lines.push(String::new());
        lines.push(format!("REGIONAL HAZARD SCORE: {:.1}%", self.hazard_score));
        lines
    }
}
