//! Chart series for the batch report.
//!
//! Each suite returns the charts for one theme. Titles carry the region
//! name, and charts with nothing to draw are left out.

use strum::IntoEnumIterator;
use traffic_map_analytics_models::{CategoryCount, Chart, ChartSpec, Rgb, StackedSeries};
use traffic_map_incident_models::{
    AgeBand, Casualty, CodedLabel, Incident, Severity, SpecialConditions, Vehicle, WEEKDAYS,
    weekday_name,
};

use crate::aggregate::{counts_by_key, value_counts};

const NUMBER_OF_COLLISIONS: &str = "Number of Collisions";

const STEEL_BLUE: Rgb = Rgb(0x46, 0x82, 0xb4);
const DARK_ORANGE: Rgb = Rgb(0xff, 0x8c, 0x00);
const SEA_GREEN: Rgb = Rgb(0x2e, 0x8b, 0x57);
const OLIVE: Rgb = Rgb(0x9b, 0x90, 0x30);
const SLATE_BLUE: Rgb = Rgb(0x6a, 0x5a, 0xcd);
const SURFACE_ORANGE: Rgb = Rgb(0xf8, 0x7a, 0x1a);
const VIOLET: Rgb = Rgb(0x5b, 0x0b, 0xf0);
const LEAF_GREEN: Rgb = Rgb(0x56, 0xcf, 0x5a);
const SKY_BLUE: Rgb = Rgb(0x3c, 0xba, 0xf0);
const DRIVER_BLUE: Rgb = Rgb(0x06, 0x98, 0xfa);
const CASUALTY_BLUE: Rgb = Rgb(0x5d, 0x88, 0xf4);
const SLATE_GREY: Rgb = Rgb(0x66, 0x72, 0x94);

/// Colour of a severity in the stacked district chart.
#[must_use]
pub const fn severity_color(severity: Severity) -> Rgb {
    match severity {
        Severity::Fatal => Rgb(0xe7, 0x4c, 0x3c),
        Severity::Serious => Rgb(0xf3, 0x9c, 0x12),
        Severity::Slight => Rgb(0xf1, 0xc4, 0x0f),
    }
}

fn bar(
    title: String,
    x_label: &str,
    y_label: &str,
    counts: Vec<CategoryCount>,
    color: Rgb,
) -> ChartSpec {
    ChartSpec {
        title,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        chart: Chart::Bar { counts, color },
    }
}

fn pie(title: String, counts: Vec<CategoryCount>, colors: Vec<Rgb>) -> ChartSpec {
    ChartSpec {
        title,
        x_label: String::new(),
        y_label: String::new(),
        chart: Chart::Pie { counts, colors },
    }
}

fn non_empty(charts: Vec<ChartSpec>) -> Vec<ChartSpec> {
    charts.into_iter().filter(|c| !c.is_empty()).collect()
}

fn keyed_counts<K: Ord + ToString>(keys: impl IntoIterator<Item = K>) -> Vec<CategoryCount> {
    counts_by_key(keys)
        .into_iter()
        .map(|(key, count)| CategoryCount::new(key.to_string(), count))
        .collect()
}

/// Counts per coded value in code order, omitting values that never occur.
fn coded_counts<T: CodedLabel + Ord>(values: impl IntoIterator<Item = T>) -> Vec<CategoryCount> {
    let counts = counts_by_key(values);
    T::iter()
        .filter_map(|v| counts.get(&v).map(|&count| CategoryCount::new(v.label(), count)))
        .collect()
}

/// Collisions by hour of day, weekday and month.
#[must_use]
pub fn temporal_suite(incidents: &[Incident], region: &str) -> Vec<ChartSpec> {
    let by_weekday = counts_by_key(incidents.iter().map(|i| i.weekday.num_days_from_monday()));
    let weekdays = WEEKDAYS
        .iter()
        .map(|&day| {
            let count = by_weekday
                .get(&day.num_days_from_monday())
                .copied()
                .unwrap_or(0);
            CategoryCount::new(weekday_name(day), count)
        })
        .collect();

    non_empty(vec![
        bar(
            format!("Collisions by Hour of Day ({region})"),
            "Hour(24h)",
            NUMBER_OF_COLLISIONS,
            keyed_counts(incidents.iter().filter_map(|i| i.hour)),
            STEEL_BLUE,
        ),
        bar(
            format!("Collisions by Weekday ({region})"),
            "Day of Week",
            NUMBER_OF_COLLISIONS,
            weekdays,
            DARK_ORANGE,
        ),
        bar(
            format!("Collisions by Month ({region})"),
            "Month",
            NUMBER_OF_COLLISIONS,
            keyed_counts(incidents.iter().map(|i| i.month)),
            SEA_GREEN,
        ),
    ])
}

/// Collisions by weather, light, surface and special site hazards.
#[must_use]
pub fn environmental_suite(incidents: &[Incident], region: &str) -> Vec<ChartSpec> {
    let hazards = value_counts(
        incidents
            .iter()
            .filter_map(|i| i.special_conditions)
            .filter(|&c| c != SpecialConditions::NoSpecial)
            .map(CodedLabel::label),
    );

    non_empty(vec![
        bar(
            format!("Collisions by Weather Condition ({region})"),
            "Weather Condition",
            NUMBER_OF_COLLISIONS,
            value_counts(incidents.iter().filter_map(|i| i.weather).map(CodedLabel::label)),
            OLIVE,
        ),
        bar(
            format!("Collisions by Light Conditions ({region})"),
            "Light Condition",
            NUMBER_OF_COLLISIONS,
            value_counts(incidents.iter().filter_map(|i| i.light).map(CodedLabel::label)),
            SLATE_BLUE,
        ),
        bar(
            format!("Collisions by Road Surface Conditions ({region})"),
            "Road Surface Condition",
            NUMBER_OF_COLLISIONS,
            value_counts(incidents.iter().filter_map(|i| i.surface).map(CodedLabel::label)),
            SURFACE_ORANGE,
        ),
        bar(
            "Special hazards at site (Excluding normal conditions)".to_string(),
            "Special Condition",
            NUMBER_OF_COLLISIONS,
            hazards,
            VIOLET,
        ),
    ])
}

/// Collisions by road type and speed limit, and the urban/rural split.
#[must_use]
pub fn infrastructure_suite(incidents: &[Incident], region: &str) -> Vec<ChartSpec> {
    non_empty(vec![
        bar(
            format!("Collisions by Road Type ({region})"),
            "Road Type",
            NUMBER_OF_COLLISIONS,
            value_counts(incidents.iter().filter_map(|i| i.display_road_type.as_deref())),
            LEAF_GREEN,
        ),
        bar(
            format!("Collisions by Speed Limit ({region})"),
            "Speed Limit (mph)",
            NUMBER_OF_COLLISIONS,
            keyed_counts(incidents.iter().filter_map(|i| i.speed_limit)),
            SKY_BLUE,
        ),
        pie(
            format!("Proportion of Urban vs Rural Collisions ({region})"),
            value_counts(
                incidents
                    .iter()
                    .filter_map(|i| i.urban_rural)
                    .map(CodedLabel::label),
            ),
            vec![Rgb(0x8c, 0xb4, 0x9d), Rgb(0xfd, 0x07, 0x07)],
        ),
    ])
}

/// Severity breakdown per district as a stacked bar chart.
#[must_use]
pub fn geography_suite(incidents: &[Incident], region: &str) -> Vec<ChartSpec> {
    let pairs: Vec<(&str, Severity)> = incidents
        .iter()
        .filter_map(|i| Some((i.district?.label(), i.severity?)))
        .collect();

    let districts: Vec<&str> = counts_by_key(pairs.iter().map(|(d, _)| *d))
        .into_keys()
        .collect();
    let crosstab = counts_by_key(pairs.iter().copied());

    let series = Severity::iter()
        .filter(|s| pairs.iter().any(|(_, sev)| sev == s))
        .map(|severity| StackedSeries {
            name: severity.label().to_string(),
            color: severity_color(severity),
            counts: districts
                .iter()
                .map(|&d| crosstab.get(&(d, severity)).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    non_empty(vec![ChartSpec {
        title: format!("Accident Severity Breakdown by {region} District"),
        x_label: "District".to_string(),
        y_label: "Number of Accidents".to_string(),
        chart: Chart::StackedBar {
            categories: districts.into_iter().map(ToString::to_string).collect(),
            series,
            legend_title: "Severity".to_string(),
        },
    }])
}

/// Driver and casualty demographics from the linked tables.
#[must_use]
pub fn demographic_suite(
    vehicles: &[Vehicle],
    casualties: &[Casualty],
    region: &str,
) -> Vec<ChartSpec> {
    let mut charts = Vec::new();

    if !vehicles.is_empty() {
        charts.push(pie(
            format!("Driver Gender Distribution {region}"),
            value_counts(vehicles.iter().filter_map(|v| v.driver_sex).map(CodedLabel::label)),
            vec![
                Rgb(0x06, 0x98, 0xf8),
                Rgb(0xf7, 0x81, 0xa8),
                Rgb(0xe2, 0xcc, 0x07),
            ],
        ));
        charts.push(bar(
            "Collisions By Driver Age Band".to_string(),
            "Age Group",
            "Count",
            coded_counts::<AgeBand>(vehicles.iter().filter_map(|v| v.driver_age_band)),
            DRIVER_BLUE,
        ));
        let mut makes = value_counts(vehicles.iter().filter_map(|v| v.make_model.as_deref()));
        makes.truncate(10);
        charts.push(bar(
            format!("Top 10 Vehicle Makes in {region} Collisions"),
            "Vehicle Make/Model",
            "Total Incidents",
            makes,
            SLATE_GREY,
        ));
    }

    if !casualties.is_empty() {
        charts.push(bar(
            "Casualty Type Distribution".to_string(),
            "Type of Person",
            "Count",
            value_counts(
                casualties
                    .iter()
                    .filter_map(|c| c.casualty_class)
                    .map(CodedLabel::label),
            ),
            CASUALTY_BLUE,
        ));
    }

    non_empty(charts)
}

/// Share of each severity as a pie, in severity order.
#[must_use]
pub fn severity_distribution(incidents: &[Incident], region: &str) -> Option<ChartSpec> {
    let counts = coded_counts::<Severity>(incidents.iter().filter_map(|i| i.severity));
    let colors = Severity::iter()
        .filter(|s| counts.iter().any(|c| c.label == s.label()))
        .map(severity_color)
        .collect();

    let chart = pie(
        format!("Collision Severity Distribution {region}"),
        counts,
        colors,
    );
    (!chart.is_empty()).then_some(chart)
}
