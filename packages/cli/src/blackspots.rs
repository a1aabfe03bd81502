//! Prints the ranked blackspots without producing a report.

use traffic_map_analytics::identify_blackspots;
use traffic_map_analytics_models::Blackspot;
use traffic_map_cli_utils::MultiProgress;

use crate::config::Config;
use crate::data::{Dataset, gazetteer};

/// Loads the data and prints the top blackspots, as text or JSON.
///
/// # Errors
///
/// * If the collision file cannot be read
/// * If the gazetteer cannot be loaded
/// * If JSON serialization fails
pub fn run(
    config: &Config,
    multi: &MultiProgress,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = Dataset::load(config, multi)?;
    let geocoder = gazetteer(config)?;
    let blackspots = identify_blackspots(
        &data.incidents,
        &geocoder,
        config.blackspots.top_n,
        config.blackspots.min_count,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&blackspots)?);
    } else if blackspots.is_empty() {
        println!("No blackspots found.");
    } else {
        print!("{}", format_listing(&blackspots));
    }

    Ok(())
}

fn format_listing(blackspots: &[Blackspot]) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for (i, spot) in blackspots.iter().enumerate() {
        let _ = writeln!(out, "{}. {} | {}", i + 1, spot.site_label, spot.road_type);
        let _ = writeln!(out, "   Coords: {}, {}", spot.latitude, spot.longitude);
        let _ = writeln!(out, "   Total Incidents: {}", spot.count);
        let _ = writeln!(out, "{}", "-".repeat(30));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_numbers_each_blackspot() {
        let spot = Blackspot {
            latitude: 53.8,
            longitude: -1.549,
            count: 4,
            area: "Leeds".to_string(),
            site_label: "Site @ 53.8, -1.549 (Leeds)".to_string(),
            road_type: "Roundabout".to_string(),
        };

        let listing = format_listing(&[spot.clone(), spot]);
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "1. Site @ 53.8, -1.549 (Leeds) | Roundabout");
        assert_eq!(lines[1], "   Coords: 53.8, -1.549");
        assert_eq!(lines[2], "   Total Incidents: 4");
        assert_eq!(lines[3], "-".repeat(30));
        assert!(lines[4].starts_with("2. "));
    }
}
