use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use simwatch_core::SimulationRequest;

use super::config::AppConfig;
use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "simwatch",
    about = "Launch a remote simulation and follow its progress",
    version,
    long_about = None
)]
pub struct Cli {
    /// Config file (RON); defaults to ./simwatch.ron when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Simulation service root URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory for downloaded artifacts
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Where log output goes
    #[arg(long, value_enum, global = true, default_value_t = LogDestination::File)]
    pub log_dest: LogDestination,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a simulation and stream its progress until it ends
    Run(RunArgs),

    /// Download a finished run's artifact by filename
    Download {
        /// Artifact name, e.g. run-001.nc
        filename: String,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Northern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lat_max: f64,

    /// Southern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lat_min: f64,

    /// Eastern longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lon_max: f64,

    /// Western longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lon_min: f64,

    /// Start date, e.g. 2024-05-01
    #[arg(long)]
    pub date: String,

    /// Simulated duration
    #[arg(long, allow_negative_numbers = true)]
    pub duration: f64,

    /// Grid resolution in (0, 1]
    #[arg(long, allow_negative_numbers = true)]
    pub resolution: f64,

    /// Fetch the artifact automatically once the run completes
    #[arg(long)]
    pub download: bool,
}

impl RunArgs {
    pub fn to_request(&self) -> SimulationRequest {
        SimulationRequest {
            lat_max: self.lat_max,
            lat_min: self.lat_min,
            lon_max: self.lon_max,
            lon_min: self.lon_min,
            date: self.date.trim().to_string(),
            duration: self.duration,
            resolution: self.resolution,
        }
    }
}

impl Cli {
    /// Applies CLI overrides on top of the loaded config.
    pub fn merge_into(&self, mut config: AppConfig) -> AppConfig {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}
