//! CMIP time series assembler.
//!
//! Discovers ensemble members on a CMIP archive, stitches their file
//! fragments into one series per member, optionally regrids and masks
//! them against an observational reference, and writes NetCDF outputs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use assembly::{AssemblyConfig, PipelineDriver};
use cmip_common::MemberPolicy;
use netcdf_parser::{NetcdfReader, NetcdfSeriesWriter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "assembler")]
#[command(about = "Assemble per-member CMIP time series from a fragmented archive")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "ASSEMBLER_CONFIG", default_value = "config/assembler.yaml")]
    config: PathBuf,

    /// Model name or wildcard (`all` for every model)
    #[arg(short, long)]
    model: Option<String>,

    /// First year of the window
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year of the window
    #[arg(long)]
    end_year: Option<i32>,

    /// Member selection policy: all | first
    #[arg(long)]
    members: Option<MemberPolicy>,

    /// Replace existing output files
    #[arg(long)]
    overwrite: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    match args.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    if let Err(e) = run(&args) {
        error!(error = %format!("{e:#}"), "Assembly failed");
        return Err(e);
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    info!(config = %args.config.display(), "Starting CMIP assembler");

    let mut config = AssemblyConfig::load(&args.config)?;
    apply_overrides(&mut config, args);

    let reader = NetcdfReader::new();
    let writer = NetcdfSeriesWriter;
    // Validates the configuration with the overrides applied
    let driver = PipelineDriver::new(&config, &reader, &writer)?;

    info!(
        experiment = %config.experiment,
        model = %config.model,
        variable = %config.variable,
        start_year = config.start_year,
        end_year = config.end_year,
        interpolate = config.interpolate,
        mask = config.mask,
        "Loaded configuration"
    );

    let report = driver.run()?;

    if let Some(path) = &args.report {
        fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write run report to {:?}", path))?;
        info!(path = %path.display(), "Wrote run report");
    }

    Ok(())
}

fn apply_overrides(config: &mut AssemblyConfig, args: &Args) {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(start_year) = args.start_year {
        config.start_year = start_year;
    }
    if let Some(end_year) = args.end_year {
        config.end_year = end_year;
    }
    if let Some(members) = args.members {
        config.members = members;
    }
    if args.overwrite {
        config.overwrite = true;
    }
}
