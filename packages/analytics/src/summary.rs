//! Headline summary for the report and metrics for the dashboard.

use std::collections::BTreeSet;

use traffic_map_analytics_models::{DashboardMetrics, Summary};
use traffic_map_incident_models::{Casualty, CodedLabel, Incident, Vehicle};

use crate::aggregate::{mode, percentage, value_counts};

/// Builds the comprehensive summary over `incidents` and their vehicles.
#[must_use]
pub fn comprehensive_summary(incidents: &[Incident], vehicles: &[Vehicle]) -> Summary {
    let total = incidents.len() as u64;
    let motorway_count = incidents.iter().filter(|i| i.is_motorway()).count() as u64;
    let high_severity = incidents
        .iter()
        .filter(|i| i.severity.is_some_and(|s| s.is_high()))
        .count() as u64;

    Summary {
        total,
        motorway_count,
        motorway_pct: percentage(motorway_count, total),
        primary_driver_gender: mode(vehicles.iter().filter_map(|v| v.driver_sex))
            .map(|s| s.label().to_string()),
        most_frequent_vehicle: mode(vehicles.iter().filter_map(|v| v.make_model.as_deref()))
            .map(ToString::to_string),
        predominant_weather: mode(incidents.iter().filter_map(|i| i.weather))
            .map(|w| w.label().to_string()),
        predominant_light: mode(incidents.iter().filter_map(|i| i.light))
            .map(|l| l.label().to_string()),
        severity_counts: value_counts(
            incidents
                .iter()
                .filter_map(|i| i.severity)
                .map(CodedLabel::label),
        ),
        hazard_score: percentage(high_severity, total),
    }
}

/// Headline metrics for the currently visible incidents.
#[must_use]
pub fn dashboard_metrics(
    visible: &[Incident],
    vehicles: &[Vehicle],
    casualties: &[Casualty],
) -> DashboardMetrics {
    let ids: BTreeSet<&str> = visible.iter().map(|i| i.collision_index.as_str()).collect();

    DashboardMetrics {
        total_incidents: visible.len() as u64,
        most_common_severity: mode(visible.iter().filter_map(|i| i.severity))
            .map(|s| s.label().to_string()),
        most_common_district: mode(visible.iter().filter_map(|i| i.district))
            .map(|d| d.label().to_string()),
        total_vehicles: vehicles
            .iter()
            .filter(|v| ids.contains(v.collision_index.as_str()))
            .count() as u64,
        total_casualties: casualties
            .iter()
            .filter(|c| ids.contains(c.collision_index.as_str()))
            .count() as u64,
    }
}

#[cfg(test)]
mod tests {
    use traffic_map_incident_models::{
        District, LightCondition, RoadClass, Severity, Sex, Weather,
    };

    use super::*;
    use crate::test_support::{casualty, incident, vehicle};

    fn incidents() -> Vec<Incident> {
        let severities = [
            Severity::Slight,
            Severity::Serious,
            Severity::Slight,
            Severity::Fatal,
        ];
        severities
            .into_iter()
            .enumerate()
            .map(|(n, severity)| {
                let mut i = incident(&n.to_string(), 53.8, -1.5);
                i.severity = Some(severity);
                i.weather = Some(if n % 2 == 0 { Weather::Raining } else { Weather::Fine });
                i.light = Some(LightCondition::Daylight);
                i.road_class = Some(if n == 0 { RoadClass::Motorway } else { RoadClass::A });
                i
            })
            .collect()
    }

    #[test]
    fn summary_scores() {
        let mut v1 = vehicle("0", Some("FORD FIESTA"));
        v1.driver_sex = Some(Sex::Female);
        let mut v2 = vehicle("1", Some("VAUXHALL CORSA"));
        v2.driver_sex = Some(Sex::Male);

        let summary = comprehensive_summary(&incidents(), &[v1, v2]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.motorway_count, 1);
        assert!((summary.motorway_pct - 25.0).abs() < 1e-9);
        assert!((summary.hazard_score - 50.0).abs() < 1e-9);
        // Ties go to the lowest code / first label.
        assert_eq!(summary.primary_driver_gender.as_deref(), Some("Male"));
        assert_eq!(summary.most_frequent_vehicle.as_deref(), Some("FORD FIESTA"));
        assert_eq!(summary.predominant_weather.as_deref(), Some("Fine (no high winds)"));
        assert_eq!(summary.predominant_light.as_deref(), Some("Daylight"));
        assert_eq!(summary.severity_counts[0].label, "Slight");
        assert_eq!(summary.severity_counts[0].count, 2);

        let lines = summary.lines();
        assert_eq!(lines[1], "MOTORWAY SCOPE: 1 incidents (25.0% of total).");
        assert_eq!(lines.last().map(String::as_str), Some("REGIONAL HAZARD SCORE: 50.0%"));
    }

    #[test]
    fn summary_of_nothing_is_zeroed() {
        let summary = comprehensive_summary(&[], &[]);
        assert_eq!(summary.total, 0);
        assert!(summary.hazard_score.abs() < f64::EPSILON);
        assert!(summary.primary_driver_gender.is_none());
        assert!(summary.lines().contains(&" - Primary Driver Gender: Unknown".to_string()));
    }

    #[test]
    fn metrics_count_linked_rows_of_visible_incidents() {
        let visible = incidents();
        let vehicles = vec![vehicle("0", None), vehicle("0", None), vehicle("99", None)];
        let casualties = vec![casualty("3"), casualty("42")];

        let metrics = dashboard_metrics(&visible, &vehicles, &casualties);

        assert_eq!(metrics.total_incidents, 4);
        assert_eq!(metrics.most_common_severity.as_deref(), Some("Slight"));
        assert_eq!(metrics.most_common_district.as_deref(), Some(District::Leeds.label()));
        assert_eq!(metrics.total_vehicles, 2);
        assert_eq!(metrics.total_casualties, 1);
    }
}
