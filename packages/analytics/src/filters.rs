//! Label-based incident filtering.
//!
//! Incident-level criteria (severity, weather, light, surface, road type)
//! are matched on the incident itself. Casualty-level criteria (gender,
//! age band) keep incidents with at least one linked casualty matching the
//! selection. All active criteria must hold; inactive ones pass
//! everything through.

use std::collections::BTreeSet;

use traffic_map_analytics_models::FilterCriteria;
use traffic_map_incident_models::{
    AgeBand, Casualty, CodedLabel, Incident, LightCondition, RoadSurface, RoadType, Severity, Sex,
    UnknownLabelError, Weather,
};

/// Errors from building a filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A selected label is not part of its code domain.
    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabelError),
}

/// Translates selected labels to their domain values. `None` means the
/// criterion is inactive.
fn selection<T: CodedLabel + Ord>(labels: &[String]) -> Result<Option<BTreeSet<T>>, FilterError> {
    if labels.is_empty() {
        return Ok(None);
    }
    let values = labels
        .iter()
        .map(|label| T::from_label(label))
        .collect::<Result<BTreeSet<T>, _>>()?;
    Ok(Some(values))
}

fn matches<T: Ord>(selected: Option<&BTreeSet<T>>, value: Option<&T>) -> bool {
    selected.is_none_or(|set| value.is_some_and(|v| set.contains(v)))
}

/// Identifiers of incidents with at least one casualty for which `pred`
/// holds.
fn casualty_ids<'a>(
    casualties: &'a [Casualty],
    pred: impl Fn(&Casualty) -> bool,
) -> BTreeSet<&'a str> {
    casualties
        .iter()
        .filter(|c| pred(c))
        .map(|c| c.collision_index.as_str())
        .collect()
}

/// Road type selection: display labels compared case-insensitively, plus
/// the codes of any selected labels that are road type labels.
///
/// The loader derives a display label whenever the road type code is
/// present, so the code path only matches incidents built without display
/// labels.
struct RoadTypeSelection {
    display: BTreeSet<String>,
    codes: BTreeSet<RoadType>,
}

impl RoadTypeSelection {
    fn new(labels: &[String]) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        Some(Self {
            display: labels.iter().map(|l| l.to_lowercase()).collect(),
            codes: labels
                .iter()
                .filter_map(|l| RoadType::from_label(l).ok())
                .collect(),
        })
    }

    fn matches(&self, incident: &Incident) -> bool {
        incident.display_road_type.as_ref().map_or_else(
            || incident.road_type.is_some_and(|t| self.codes.contains(&t)),
            |display| self.display.contains(&display.to_lowercase()),
        )
    }
}

/// Applies `criteria` to `incidents`, joining against `casualties` for the
/// gender and age band criteria.
///
/// # Errors
///
/// Returns [`FilterError::UnknownLabel`] if a severity, weather, light,
/// surface, gender or age band label is not recognised.
pub fn apply_filters(
    incidents: &[Incident],
    casualties: &[Casualty],
    criteria: &FilterCriteria,
) -> Result<Vec<Incident>, FilterError> {
    let severity = selection::<Severity>(&criteria.severity)?;
    let weather = selection::<Weather>(&criteria.weather)?;
    let light = selection::<LightCondition>(&criteria.light)?;
    let surface = selection::<RoadSurface>(&criteria.surface)?;
    let road_type = RoadTypeSelection::new(&criteria.road_type);

    let gender_ids = selection::<Sex>(&criteria.gender)?.map(|sexes| {
        casualty_ids(casualties, |c| c.sex.is_some_and(|s| sexes.contains(&s)))
    });
    let age_ids = selection::<AgeBand>(&criteria.age_band)?.map(|bands| {
        casualty_ids(casualties, |c| {
            c.age_band.is_some_and(|band| bands.contains(&band))
        })
    });

    let filtered: Vec<Incident> = incidents
        .iter()
        .filter(|i| matches(severity.as_ref(), i.severity.as_ref()))
        .filter(|i| matches(weather.as_ref(), i.weather.as_ref()))
        .filter(|i| matches(light.as_ref(), i.light.as_ref()))
        .filter(|i| matches(surface.as_ref(), i.surface.as_ref()))
        .filter(|i| road_type.as_ref().is_none_or(|sel| sel.matches(i)))
        .filter(|i| {
            gender_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(i.collision_index.as_str()))
        })
        .filter(|i| {
            age_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(i.collision_index.as_str()))
        })
        .cloned()
        .collect();

    log::debug!(
        "Filters kept {} of {} incidents",
        filtered.len(),
        incidents.len()
    );

    Ok(filtered)
}

/// The incidents to present: nothing at all while no filter is active,
/// otherwise `filtered` unchanged.
#[must_use]
pub fn visible_incidents(filtered: Vec<Incident>, criteria: &FilterCriteria) -> Vec<Incident> {
    if criteria.is_empty() {
        Vec::new()
    } else {
        filtered
    }
}

/// Incidents that happened in `year`.
#[must_use]
pub fn incidents_in_year(incidents: &[Incident], year: i32) -> Vec<Incident> {
    incidents
        .iter()
        .filter(|i| i.year == year)
        .cloned()
        .collect()
}

/// Distinct years present in `incidents`, most recent first.
#[must_use]
pub fn available_years(incidents: &[Incident]) -> Vec<i32> {
    let years: BTreeSet<i32> = incidents.iter().map(|i| i.year).collect();
    years.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use traffic_map_incident_models::RoadClass;

    use super::*;
    use crate::test_support::{casualty, incident};

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn sample() -> (Vec<Incident>, Vec<Casualty>) {
        let mut a = incident("A", 53.8, -1.5);
        a.severity = Some(Severity::Fatal);
        a.weather = Some(Weather::Raining);
        a.road_type = Some(RoadType::Roundabout);
        a.display_road_type = Some("Roundabout".to_string());

        let mut b = incident("B", 53.7, -1.6);
        b.severity = Some(Severity::Slight);
        b.weather = Some(Weather::Fine);
        b.road_class = Some(RoadClass::Motorway);
        b.road_type = Some(RoadType::DualCarriageway);
        b.display_road_type = Some("Motorway(Dual carriageway)".to_string());

        let mut c = incident("C", 53.6, -1.7);
        c.severity = Some(Severity::Slight);
        c.weather = Some(Weather::Raining);

        let mut cas_a = casualty("A");
        cas_a.sex = Some(Sex::Female);
        cas_a.age_band = Some(AgeBand::From26To35);
        let mut cas_b = casualty("B");
        cas_b.sex = Some(Sex::Male);
        cas_b.age_band = Some(AgeBand::Over75);
        let mut cas_x = casualty("X");
        cas_x.sex = Some(Sex::Male);

        (vec![a, b, c], vec![cas_a, cas_b, cas_x])
    }

    fn ids(incidents: &[Incident]) -> Vec<&str> {
        incidents.iter().map(|i| i.collision_index.as_str()).collect()
    }

    #[test]
    fn empty_criteria_pass_everything_through() {
        let (incidents, casualties) = sample();
        let filtered = apply_filters(&incidents, &casualties, &FilterCriteria::default()).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn no_active_filter_shows_nothing() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria::default();
        let filtered = apply_filters(&incidents, &casualties, &criteria).unwrap();

        assert!(visible_incidents(filtered, &criteria).is_empty());
    }

    #[test]
    fn incident_level_criteria_compose() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria {
            severity: labels(&["Slight"]),
            weather: labels(&["Raining (no high winds)"]),
            ..FilterCriteria::default()
        };

        let filtered = apply_filters(&incidents, &casualties, &criteria).unwrap();

        assert_eq!(ids(&filtered), vec!["C"]);
        assert_eq!(ids(&visible_incidents(filtered, &criteria)), vec!["C"]);
    }

    #[test]
    fn gender_joins_through_casualties() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria {
            gender: labels(&["Male"]),
            ..FilterCriteria::default()
        };

        let filtered = apply_filters(&incidents, &casualties, &criteria).unwrap();

        assert_eq!(ids(&filtered), vec!["B"]);
    }

    #[test]
    fn casualty_criteria_without_matches_yield_nothing() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria {
            gender: labels(&["Unknown"]),
            ..FilterCriteria::default()
        };
        assert!(apply_filters(&incidents, &casualties, &criteria).unwrap().is_empty());

        let criteria = FilterCriteria {
            age_band: labels(&["0-5"]),
            ..FilterCriteria::default()
        };
        assert!(apply_filters(&incidents, &[], &criteria).unwrap().is_empty());
    }

    #[test]
    fn road_type_matches_display_label_case_insensitively() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria {
            road_type: labels(&["motorway(dual carriageway)", "ROUNDABOUT"]),
            ..FilterCriteria::default()
        };

        let filtered = apply_filters(&incidents, &casualties, &criteria).unwrap();

        assert_eq!(ids(&filtered), vec!["A", "B"]);
    }

    #[test]
    fn road_type_falls_back_to_code_without_display_label() {
        let mut only_code = incident("D", 53.8, -1.5);
        only_code.road_type = Some(RoadType::Slip);
        let criteria = FilterCriteria {
            road_type: labels(&["Slip", "Not a road type"]),
            ..FilterCriteria::default()
        };

        let filtered = apply_filters(&[only_code], &[], &criteria).unwrap();

        assert_eq!(ids(&filtered), vec!["D"]);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let (incidents, casualties) = sample();
        let criteria = FilterCriteria {
            weather: labels(&["Sunny"]),
            ..FilterCriteria::default()
        };

        let err = apply_filters(&incidents, &casualties, &criteria).unwrap_err();

        assert!(matches!(err, FilterError::UnknownLabel(ref e) if e.label == "Sunny"));
    }

    #[test]
    fn years_are_selected_and_listed() {
        let (mut incidents, _) = sample();
        incidents[0].year = 2022;

        assert_eq!(available_years(&incidents), vec![2023, 2022]);
        assert_eq!(ids(&incidents_in_year(&incidents, 2023)), vec!["B", "C"]);
    }
}
