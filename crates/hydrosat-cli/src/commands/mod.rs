pub mod alerts;
pub mod changes;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod job;
pub mod watersheds;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use hydrosat_core::composite::CompositeMethod;
use hydrosat_core::imagery::load_catalog;
use hydrosat_core::monitor::{MonitorConfig, MonitoringService, ProgressReporter};
use hydrosat_core::period::Period;
use hydrosat_core::region::RegionCatalog;
use serde::Serialize;

/// Inputs every command needs to build the monitoring service.
#[derive(Args)]
pub struct ServiceArgs {
    /// Scene catalog (JSON)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Engine config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl ServiceArgs {
    pub fn load_config(&self) -> Result<MonitorConfig> {
        let Some(ref path) = self.config else {
            return Ok(MonitorConfig::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: MonitorConfig = toml::from_str(&contents).context("Invalid engine config")?;
        Ok(config)
    }

    pub fn service(&self, reporter: Arc<dyn ProgressReporter>) -> Result<MonitoringService> {
        let config = self.load_config()?;
        let provider = load_catalog(&self.catalog)
            .with_context(|| format!("Failed to load catalog {}", self.catalog.display()))?;
        let service = MonitoringService::new(Arc::new(provider), RegionCatalog::consortium(), config)?;
        Ok(service.with_reporter(reporter))
    }
}

/// Date window given as `--start` / `--end`.
#[derive(Args)]
pub struct PeriodArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Day after the last day of the window (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,
}

impl PeriodArgs {
    pub fn period(&self) -> Result<Period> {
        Ok(Period::new(self.start, self.end)?)
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Mosaic,
    Median,
}

impl From<MethodArg> for CompositeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Mosaic => CompositeMethod::Mosaic,
            MethodArg::Median => CompositeMethod::Median,
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
