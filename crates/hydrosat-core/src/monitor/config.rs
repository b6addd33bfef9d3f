use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationOptions;
use crate::alerts::AlertConfig;
use crate::classify::ClassificationThresholds;
use crate::composite::CompositeMethod;
use crate::consts::{
    DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_DASHBOARD_DAYS_BACK, DEFAULT_DASHBOARD_TTL_SECS,
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_JOB_WORKERS, DEFAULT_MAX_CLOUD_PCT,
};
use crate::error::{HydrosatError, Result};

/// Complete engine configuration, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub imagery: ImageryConfig,
    #[serde(default)]
    pub thresholds: ClassificationThresholds,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub aggregation: AggregationOptions,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub jobs: JobConfig,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        self.imagery.validate()?;
        self.thresholds.validate()?;
        self.alerts.validate()?;
        self.aggregation.validate()?;
        if self.dashboard.ttl_secs == 0 {
            return Err(HydrosatError::InvalidConfig(
                "dashboard.ttl_secs must be positive".to_string(),
            ));
        }
        if self.dashboard.days_back <= 0 {
            return Err(HydrosatError::InvalidConfig(
                "dashboard.days_back must be positive".to_string(),
            ));
        }
        if self.jobs.workers == 0 || self.jobs.timeout_secs == 0 {
            return Err(HydrosatError::InvalidConfig(
                "jobs.workers and jobs.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageryConfig {
    /// Scenes at or above this cloud cover (percent) are rejected.
    #[serde(default = "default_max_cloud_pct")]
    pub max_cloud_pct: f32,
    #[serde(default)]
    pub method: CompositeMethod,
    /// Per-call limit on the imagery backend.
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,
}

fn default_max_cloud_pct() -> f32 {
    DEFAULT_MAX_CLOUD_PCT
}
fn default_backend_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            max_cloud_pct: DEFAULT_MAX_CLOUD_PCT,
            method: CompositeMethod::default(),
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

impl ImageryConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_cloud_pct) {
            return Err(HydrosatError::InvalidConfig(format!(
                "imagery.max_cloud_pct must lie in [0, 100], got {}",
                self.max_cloud_pct
            )));
        }
        if self.backend_timeout_secs == 0 {
            return Err(HydrosatError::InvalidConfig(
                "imagery.backend_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Length of the trailing window summarised.
    #[serde(default = "default_days_back")]
    pub days_back: i64,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_DASHBOARD_TTL_SECS
}
fn default_days_back() -> i64 {
    DEFAULT_DASHBOARD_DAYS_BACK
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_DASHBOARD_TTL_SECS,
            days_back: DEFAULT_DASHBOARD_DAYS_BACK,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Wall-clock limit per job.
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_workers() -> usize {
    DEFAULT_JOB_WORKERS
}
fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_JOB_WORKERS,
            timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
        }
    }
}
