//! Batch report: the full analysis written to the output directory.
//!
//! Stages run in order: load, blackspots, charts, summary, map and
//! GeoJSON, PDF. Charts are written before the PDF stage scans the output
//! directory for them. Only a failure to read the collision file stops the
//! run; every other stage logs its failure and carries on.

use std::time::Instant;

use traffic_map_analytics::{apply_filters, comprehensive_summary, identify_blackspots, suites};
use traffic_map_analytics_models::{Blackspot, ChartSpec};
use traffic_map_cli_utils::{IndicatifProgress, MultiProgress};
use traffic_map_loader::period_of;
use traffic_map_report::{
    BLACKSPOTS_FILE, generate_pdf_report, render_blackspot_chart, render_charts,
    write_blackspots_geojson, write_incident_map,
};

use crate::config::Config;
use crate::data::{Dataset, gazetteer};

const TOTAL_STAGES: u64 = 6;

/// Runs the batch report.
///
/// # Errors
///
/// * If the collision file cannot be read
/// * If the configured filters name an unknown label
/// * If the output directory or the PDF cannot be written
pub fn run(config: &Config, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let stages = IndicatifProgress::stages_bar(multi, "Batch report", TOTAL_STAGES);

    // --- 1. Load ---
    stages.set_message(format!("[1/{TOTAL_STAGES}] Loading data"));
    let loaded = Dataset::load(config, multi)?;
    if loaded.incidents.is_empty() {
        log::error!(
            "No collisions loaded from {}. Please check the file path and district list.",
            config.data.accidents.display()
        );
        stages.finish("No data to analyse".to_string());
        return Ok(());
    }

    let data = if config.filters.is_empty() {
        loaded
    } else {
        let filtered = apply_filters(&loaded.incidents, &loaded.casualties, &config.filters)?;
        log::info!(
            "Configured filters kept {} of {} collisions",
            filtered.len(),
            loaded.incidents.len()
        );
        loaded.restricted_to(filtered)
    };
    if data.incidents.is_empty() {
        log::error!("No collisions match the configured filters.");
        stages.finish("No data to analyse".to_string());
        return Ok(());
    }
    let period = period_of(&data.incidents);
    log::info!("Analysing data from: {period}");
    std::fs::create_dir_all(&config.output.dir)?;
    stages.inc(1);

    // --- 2. Blackspots ---
    stages.set_message(format!("[2/{TOTAL_STAGES}] Identifying blackspots"));
    let blackspots = match gazetteer(config) {
        Ok(geocoder) => identify_blackspots(
            &data.incidents,
            &geocoder,
            config.blackspots.top_n,
            config.blackspots.min_count,
        ),
        Err(e) => {
            log::error!("Blackspot identification skipped, gazetteer unavailable: {e}");
            Vec::new()
        }
    };
    log_blackspots(&blackspots);
    stages.inc(1);

    // --- 3. Charts ---
    stages.set_message(format!("[3/{TOTAL_STAGES}] Rendering charts"));
    let specs = chart_specs(&data, &config.region.name);
    let chart_bar = IndicatifProgress::artifacts_bar(multi, "Rendering charts");
    let written = render_charts(&specs, &config.output.dir, &chart_bar);
    chart_bar.finish(format!("Rendered {} of {} charts", written.len(), specs.len()));
    if written.len() < specs.len() {
        log::warn!("Some charts are missing; see the warnings above");
    }
    if let Err(e) =
        render_blackspot_chart(&blackspots, &config.region.name, &period, &config.output.dir)
    {
        log::warn!("Skipping blackspot chart: {e}");
    }
    stages.inc(1);

    // --- 4. Summary ---
    stages.set_message(format!("[4/{TOTAL_STAGES}] Summarising"));
    let summary = comprehensive_summary(&data.incidents, &data.vehicles);
    let mut report_lines = vec![format!("Analysis Period: {period}"), String::new()];
    report_lines.extend(summary.lines());
    stages.inc(1);

    // --- 5. Map and GeoJSON ---
    stages.set_message(format!("[5/{TOTAL_STAGES}] Writing map"));
    if let Err(e) = write_incident_map(
        &data.incidents,
        &data.vehicles,
        &data.casualties,
        &blackspots,
        &config.map_options(),
        &config.map_path(),
    ) {
        log::warn!("Skipping map: {e}");
    }
    if let Err(e) = write_blackspots_geojson(&blackspots, &config.output.dir.join(BLACKSPOTS_FILE))
    {
        log::warn!("Skipping blackspot export: {e}");
    }
    stages.inc(1);

    // --- 6. PDF ---
    stages.set_message(format!("[6/{TOTAL_STAGES}] Writing PDF"));
    let pdf = generate_pdf_report(
        &report_lines,
        &blackspots,
        &config.output.dir,
        &config.pdf_options(),
    )?;
    stages.inc(1);

    stages.finish(format!(
        "Analysis complete in {:.2}s: {}",
        start.elapsed().as_secs_f64(),
        pdf.display()
    ));

    Ok(())
}

/// Every chart of the report, in suite order.
fn chart_specs(data: &Dataset, region: &str) -> Vec<ChartSpec> {
    let mut specs = Vec::new();
    specs.extend(suites::geography_suite(&data.incidents, region));
    specs.extend(suites::temporal_suite(&data.incidents, region));
    specs.extend(suites::infrastructure_suite(&data.incidents, region));
    specs.extend(suites::environmental_suite(&data.incidents, region));
    specs.extend(suites::demographic_suite(
        &data.vehicles,
        &data.casualties,
        region,
    ));
    specs.extend(suites::severity_distribution(&data.incidents, region));
    specs
}

fn log_blackspots(blackspots: &[Blackspot]) {
    if blackspots.is_empty() {
        log::info!("No blackspots met the minimum incident count");
    }
    for (rank, spot) in blackspots.iter().enumerate() {
        log::info!(
            "{}. {} | {} ({} incidents)",
            rank + 1,
            spot.site_label,
            spot.road_type,
            spot.count
        );
    }
}
