#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the traffic map toolchain.
//!
//! With a subcommand, runs that tool directly. Without one, lets the user
//! pick a tool interactively.
//!
//! Uses `indicatif-log-bridge` (via [`traffic_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod batch;
mod blackspots;
mod config;
mod data;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Select;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "traffic_map", about = "Traffic collision analysis toolchain")]
struct Cli {
    /// TOML config merged over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Collision CSV (overrides the config)
    #[arg(long, global = true)]
    accidents: Option<PathBuf>,
    /// Vehicle CSV (overrides the config)
    #[arg(long, global = true)]
    vehicles: Option<PathBuf>,
    /// Casualty CSV (overrides the config)
    #[arg(long, global = true)]
    casualties: Option<PathBuf>,
    /// Directory for charts, the map and the PDF (overrides the config)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write charts, map, GeoJSON and PDF
    Report,
    /// Explore the collisions interactively
    Dashboard,
    /// Print the ranked accident blackspots
    Blackspots {
        /// Number of blackspots to list
        #[arg(long)]
        top_n: Option<usize>,
        /// Minimum incidents for a cell to qualify
        #[arg(long)]
        min_count: Option<u64>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Top-level tool selection when no subcommand is given.
enum Tool {
    Report,
    Dashboard,
    Blackspots,
}

impl Tool {
    const ALL: &[Self] = &[Self::Dashboard, Self::Report, Self::Blackspots];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Report => "Generate full report (charts, map, PDF)",
            Self::Dashboard => "Open dashboard",
            Self::Blackspots => "List accident blackspots",
        }
    }
}

impl Cli {
    /// Applies the path flags over the loaded configuration.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.accidents {
            config.data.accidents.clone_from(path);
        }
        if let Some(path) = &self.vehicles {
            config.data.vehicles.clone_from(path);
        }
        if let Some(path) = &self.casualties {
            config.data.casualties.clone_from(path);
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir.clone_from(dir);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = traffic_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let Some(command) = cli.command else {
        println!("{} Traffic Map", config.region.name);
        println!();

        let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        return match Tool::ALL[idx] {
            Tool::Report => batch::run(&config, &multi),
            Tool::Dashboard => interactive::run(&config, &multi),
            Tool::Blackspots => blackspots::run(&config, &multi, false),
        };
    };

    match command {
        Commands::Report => batch::run(&config, &multi)?,
        Commands::Dashboard => interactive::run(&config, &multi)?,
        Commands::Blackspots {
            top_n,
            min_count,
            json,
        } => {
            if let Some(top_n) = top_n {
                config.blackspots.top_n = top_n;
            }
            if let Some(min_count) = min_count {
                config.blackspots.min_count = min_count;
            }
            blackspots::run(&config, &multi, json)?;
        }
    }

    Ok(())
}
