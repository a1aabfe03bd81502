#![allow(clippy::module_name_repetitions)]

//! Interactive dashboard for exploring the loaded collisions.
//!
//! The tables are read once per session. Every action produces a new
//! [`DashboardState`] and the view is recomputed from scratch with
//! [`compute_view`]. Nothing is written to disk unless the user chooses
//! "Export map".

use std::collections::BTreeSet;

use dialoguer::{MultiSelect, Select};
use traffic_map_analytics::filters::available_years;
use traffic_map_analytics::{
    FilterError, apply_filters, dashboard_metrics, identify_blackspots, incidents_in_year,
    visible_incidents,
};
use traffic_map_analytics_models::{DashboardMetrics, FilterCriteria};
use traffic_map_cli_utils::MultiProgress;
use traffic_map_incident_models::{
    AgeBand, CodedLabel, Incident, LightCondition, RoadSurface, Severity, Sex, Weather,
};
use traffic_map_report::{MapOptions, MarkerColoring, write_incident_map};

use crate::config::Config;
use crate::data::{Dataset, gazetteer};

/// The dashboard's selections. Never mutated in place: every action
/// returns a new value, and reset is `DashboardState::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    /// Selected year; `None` means the most recent year in the data.
    pub year: Option<i32>,
    pub criteria: FilterCriteria,
    pub show_blackspots: bool,
}

impl DashboardState {
    #[must_use]
    pub fn with_year(&self, year: i32) -> Self {
        Self {
            year: Some(year),
            ..self.clone()
        }
    }

    /// Replaces the selection of one criterion.
    #[must_use]
    pub fn with_selection(&self, criterion: Criterion, labels: Vec<String>) -> Self {
        let mut criteria = self.criteria.clone();
        *criterion.slot(&mut criteria) = labels;
        Self {
            criteria,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn toggle_blackspots(&self) -> Self {
        Self {
            show_blackspots: !self.show_blackspots,
            ..self.clone()
        }
    }
}

/// One filterable dimension of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Severity,
    Gender,
    AgeBand,
    Weather,
    Light,
    Surface,
    RoadType,
}

impl Criterion {
    const ALL: &[Self] = &[
        Self::Severity,
        Self::Gender,
        Self::AgeBand,
        Self::Weather,
        Self::Light,
        Self::Surface,
        Self::RoadType,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Severity => "Accident Severity",
            Self::Gender => "Casualty Gender",
            Self::AgeBand => "Casualty Age Group",
            Self::Weather => "Weather Conditions",
            Self::Light => "Light Conditions",
            Self::Surface => "Road Surface Conditions",
            Self::RoadType => "Road Type",
        }
    }

    /// The labels offered for this criterion. Road types are the display
    /// road types present in `incidents`.
    fn options(self, incidents: &[Incident]) -> Vec<String> {
        let fixed = match self {
            Self::Severity => Severity::labels(),
            Self::Gender => Sex::labels(),
            Self::AgeBand => AgeBand::labels(),
            Self::Weather => Weather::labels(),
            Self::Light => LightCondition::labels(),
            Self::Surface => RoadSurface::labels(),
            Self::RoadType => {
                let present: BTreeSet<&str> = incidents
                    .iter()
                    .filter_map(|i| i.display_road_type.as_deref())
                    .collect();
                return present.into_iter().map(str::to_string).collect();
            }
        };
        fixed.into_iter().map(str::to_string).collect()
    }

    fn slot(self, criteria: &mut FilterCriteria) -> &mut Vec<String> {
        match self {
            Self::Severity => &mut criteria.severity,
            Self::Gender => &mut criteria.gender,
            Self::AgeBand => &mut criteria.age_band,
            Self::Weather => &mut criteria.weather,
            Self::Light => &mut criteria.light,
            Self::Surface => &mut criteria.surface,
            Self::RoadType => &mut criteria.road_type,
        }
    }

    fn current(self, criteria: &FilterCriteria) -> &[String] {
        match self {
            Self::Severity => &criteria.severity,
            Self::Gender => &criteria.gender,
            Self::AgeBand => &criteria.age_band,
            Self::Weather => &criteria.weather,
            Self::Light => &criteria.light,
            Self::Surface => &criteria.surface,
            Self::RoadType => &criteria.road_type,
        }
    }
}

/// What the dashboard shows for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// The year the view was narrowed to, if the data has any.
    pub year: Option<i32>,
    pub visible: Vec<Incident>,
    pub metrics: DashboardMetrics,
}

/// Computes the view for `state`: narrow to the year, apply the filters,
/// then hide everything while no filter is active.
///
/// # Errors
///
/// * If a selected label is not recognised
pub fn compute_view(data: &Dataset, state: &DashboardState) -> Result<DashboardView, FilterError> {
    let year = state
        .year
        .or_else(|| available_years(&data.incidents).first().copied());
    let in_year = year.map_or_else(
        || data.incidents.clone(),
        |year| incidents_in_year(&data.incidents, year),
    );

    let filtered = apply_filters(&in_year, &data.casualties, &state.criteria)?;
    let visible = visible_incidents(filtered, &state.criteria);
    let metrics = dashboard_metrics(&visible, &data.vehicles, &data.casualties);

    Ok(DashboardView {
        year,
        visible,
        metrics,
    })
}

/// Top-level dashboard actions.
enum DashboardAction {
    SelectYear,
    EditFilters,
    ToggleBlackspots,
    Reset,
    ExportMap,
    Quit,
}

impl DashboardAction {
    const ALL: &[Self] = &[
        Self::EditFilters,
        Self::SelectYear,
        Self::ToggleBlackspots,
        Self::ExportMap,
        Self::Reset,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::SelectYear => "Select year",
            Self::EditFilters => "Edit filters",
            Self::ToggleBlackspots => "Toggle blackspot highlight",
            Self::Reset => "Reset filters",
            Self::ExportMap => "Export map",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the dashboard until the user quits.
///
/// # Errors
///
/// * If the collision file cannot be read
/// * If a prompt fails
pub fn run(config: &Config, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let data = Dataset::load(config, multi)?;
    if data.incidents.is_empty() {
        log::error!(
            "No collisions loaded from {}. Please check the file path and district list.",
            config.data.accidents.display()
        );
        return Ok(());
    }

    let years = available_years(&data.incidents);
    let labels: Vec<&str> = DashboardAction::ALL
        .iter()
        .map(DashboardAction::label)
        .collect();
    let mut state = DashboardState::default();

    loop {
        let view = match compute_view(&data, &state) {
            Ok(view) => view,
            Err(e) => {
                log::error!("{e}");
                state = DashboardState::default();
                continue;
            }
        };
        print_view(&config.region.name, &state, &view);

        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        state = match DashboardAction::ALL[idx] {
            DashboardAction::SelectYear => {
                let year_labels: Vec<String> = years.iter().map(ToString::to_string).collect();
                let current = view
                    .year
                    .and_then(|y| years.iter().position(|&candidate| candidate == y))
                    .unwrap_or(0);
                let chosen = Select::new()
                    .with_prompt("Select Year")
                    .items(&year_labels)
                    .default(current)
                    .interact()?;
                state.with_year(years[chosen])
            }
            DashboardAction::EditFilters => edit_filters(&state, &data.incidents)?,
            DashboardAction::ToggleBlackspots => state.toggle_blackspots(),
            DashboardAction::Reset => DashboardState::default(),
            DashboardAction::ExportMap => {
                export_map(config, &data, &state, &view);
                state
            }
            DashboardAction::Quit => break,
        };
    }

    Ok(())
}

/// Prompts for a criterion, then for its selected labels.
fn edit_filters(
    state: &DashboardState,
    incidents: &[Incident],
) -> Result<DashboardState, Box<dyn std::error::Error>> {
    let labels: Vec<String> = Criterion::ALL
        .iter()
        .map(|c| {
            let active = c.current(&state.criteria).len();
            if active == 0 {
                c.label().to_string()
            } else {
                format!("{} ({active} selected)", c.label())
            }
        })
        .collect();

    let idx = Select::new()
        .with_prompt("Which filter?")
        .items(&labels)
        .default(0)
        .interact()?;
    let criterion = Criterion::ALL[idx];

    let options = criterion.options(incidents);
    if options.is_empty() {
        println!("No values available for {}.", criterion.label());
        return Ok(state.clone());
    }
    let current = criterion.current(&state.criteria);
    let defaults: Vec<bool> = options.iter().map(|o| current.contains(o)).collect();

    let selected = MultiSelect::new()
        .with_prompt(format!(
            "{} (space=toggle, enter=confirm)",
            criterion.label()
        ))
        .items(&options)
        .defaults(&defaults)
        .max_length(20)
        .interact()?;

    let chosen = selected.into_iter().map(|i| options[i].clone()).collect();
    Ok(state.with_selection(criterion, chosen))
}

fn print_view(region: &str, state: &DashboardState, view: &DashboardView) {
    println!();
    match view.year {
        Some(year) => println!("{region} Traffic Collision Dashboard ({year})"),
        None => println!("{region} Traffic Collision Dashboard"),
    }

    if view.visible.is_empty() {
        if state.criteria.is_empty() {
            println!("Getting Started: select at least one filter to display collisions.");
        } else {
            println!("No collisions match the selected filters.");
        }
        return;
    }

    let metrics = &view.metrics;
    let none = || "N/A".to_string();
    println!("  {:<24}{}", "Total Incidents", metrics.total_incidents);
    println!(
        "  {:<24}{}",
        "Most Common Severity",
        metrics.most_common_severity.clone().unwrap_or_else(none)
    );
    println!(
        "  {:<24}{}",
        "Most Affected District",
        metrics.most_common_district.clone().unwrap_or_else(none)
    );
    println!("  {:<24}{}", "Vehicles Involved", metrics.total_vehicles);
    println!("  {:<24}{}", "Casualties", metrics.total_casualties);
    if state.show_blackspots {
        println!("  Blackspot highlight is on (applies to the exported map).");
    }
}

/// Writes the map of the visible collisions. Failures are logged.
fn export_map(config: &Config, data: &Dataset, state: &DashboardState, view: &DashboardView) {
    if view.visible.is_empty() {
        println!("Nothing to export: no collisions are visible.");
        return;
    }

    let blackspots = if state.show_blackspots {
        match gazetteer(config) {
            Ok(geocoder) => identify_blackspots(
                &view.visible,
                &geocoder,
                config.blackspots.top_n,
                config.blackspots.min_count,
            ),
            Err(e) => {
                log::warn!("Blackspots unavailable: {e}");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let options = MapOptions {
        marker_limit: config.map.marker_limit,
        coloring: MarkerColoring::Severity,
        heat_layer: state.show_blackspots,
        title: format!("{} Map Guide", config.region.name),
        ..MapOptions::default()
    };
    let path = config.map_path();

    match write_incident_map(
        &view.visible,
        &data.vehicles,
        &data.casualties,
        &blackspots,
        &options,
        &path,
    ) {
        Ok(()) => println!("Map written to {}", path.display()),
        Err(e) => log::error!("Failed to write map: {e}"),
    }
}
