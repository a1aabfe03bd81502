//! Layered TOML configuration.
//!
//! The built-in `config/default.toml` is embedded at compile time. A user
//! file is merged over it table by table, so any key the user leaves out
//! keeps its default.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use traffic_map_analytics_models::FilterCriteria;
use traffic_map_report::{MapOptions, MarkerColoring, PdfOptions};

/// Built-in configuration, embedded at compile time.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors from loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The user config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path to the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A config layer is not valid TOML or has the wrong shape.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Input data files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataConfig {
    /// Collision (primary) CSV.
    pub accidents: PathBuf,
    /// Vehicle CSV.
    pub vehicles: PathBuf,
    /// Casualty CSV.
    pub casualties: PathBuf,
}

/// The analysed region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionConfig {
    /// Region name used in chart titles.
    pub name: String,
    /// ONS district codes kept by the loader.
    pub districts: Vec<String>,
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Directory for charts, the map, the GeoJSON and the PDF.
    pub dir: PathBuf,
    pub report_file: String,
    pub report_title: String,
    pub map_file: String,
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeocoderConfig {
    /// User gazetteer; the embedded one is used when unset.
    pub gazetteer: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BlackspotConfig {
    pub top_n: usize,
    pub min_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MapConfig {
    pub marker_limit: usize,
    pub coloring: MarkerColoring,
    pub heat_layer: bool,
}

/// The complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub region: RegionConfig,
    pub output: OutputConfig,
    pub geocoder: GeocoderConfig,
    pub blackspots: BlackspotConfig,
    pub map: MapConfig,
    /// Filters applied to the batch report.
    pub filters: FilterCriteria,
}

impl Config {
    /// Loads the defaults, merged with the file at `path` if given.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If either layer is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let user = path
            .map(|path| {
                std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            })
            .transpose()?;

        if let Some(path) = path {
            log::info!("Using config {}", path.display());
        }

        Self::from_layers(user.as_deref())
    }

    /// Parses the defaults, merged with `user` TOML text if given.
    ///
    /// # Errors
    ///
    /// * If either layer is invalid
    pub fn from_layers(user: Option<&str>) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        if let Some(user) = user {
            let overlay: toml::Table = toml::from_str(user)?;
            merge(&mut merged, overlay);
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Map options for the batch report.
    #[must_use]
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            marker_limit: self.map.marker_limit,
            coloring: self.map.coloring,
            heat_layer: self.map.heat_layer,
            title: format!("{} Map Guide", self.region.name),
            ..MapOptions::default()
        }
    }

    /// PDF options for the batch report.
    #[must_use]
    pub fn pdf_options(&self) -> PdfOptions {
        PdfOptions {
            output_dir: self.output.dir.clone(),
            file_name: self.output.report_file.clone(),
            title: self.output.report_title.clone(),
            logo: self.output.logo.clone(),
            ..PdfOptions::default()
        }
    }

    /// Path of the exported map.
    #[must_use]
    pub fn map_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.map_file)
    }
}

/// Recursively merges `overlay` into `base`. Tables merge key by key;
/// every other value in `overlay` replaces the one in `base`.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::from_layers(None).unwrap();

        assert_eq!(config.data.accidents, PathBuf::from("data/accidents.csv"));
        assert_eq!(config.region.name, "West Yorkshire");
        assert_eq!(config.region.districts.len(), 5);
        assert_eq!(config.blackspots, BlackspotConfig { top_n: 5, min_count: 2 });
        assert_eq!(config.map.marker_limit, 2500);
        assert_eq!(config.map.coloring, MarkerColoring::RoadClass);
        assert!(config.filters.is_empty());
        assert!(config.geocoder.gazetteer.is_none());
        assert_eq!(
            config.output.report_file,
            "West_Yorkshire_Traffic_Analysis_Report.pdf"
        );
    }

    #[test]
    fn partial_user_config_keeps_defaults() {
        let config = Config::from_layers(Some(
            r#"
[blackspots]
top_n = 10

[filters]
severity = ["Fatal", "Serious"]

[geocoder]
gazetteer = "places.csv"
"#,
        ))
        .unwrap();

        assert_eq!(config.blackspots.top_n, 10);
        assert_eq!(config.blackspots.min_count, 2);
        assert_eq!(config.filters.severity, vec!["Fatal", "Serious"]);
        assert!(config.filters.weather.is_empty());
        assert_eq!(config.geocoder.gazetteer, Some(PathBuf::from("places.csv")));
        assert_eq!(config.data.vehicles, PathBuf::from("data/vehicles.csv"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = Config::from_layers(Some("[blackspots]\ntop_n = \"five\"\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_user_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn user_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.toml");
        std::fs::write(&path, "[region]\nname = \"Leeds\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.region.name, "Leeds");
        assert_eq!(config.region.districts.len(), 5);
        assert_eq!(config.map_options().title, "Leeds Map Guide");
    }
}
