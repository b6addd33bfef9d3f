//! Severity-ranked operational alerts per watershed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::change::ChangeReport;
use crate::consts::{DEFAULT_CRITICAL_PROBLEMATIC_PCT, ELEVATED_PROBLEMATIC_PCT, SIGNIFICANT_TREND_DELTA_PCT};
use crate::error::{HydrosatError, Result};
use crate::period::Period;
use crate::region::Watershed;
use crate::report::WatershedReport;

/// Alert severity; sorts high first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Problematic share above the critical threshold.
    CriticalArea,
    /// Problematic share above the fixed elevated threshold.
    ElevatedArea,
    /// Problematic share rose significantly against the reference period.
    RisingWaterlogging,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub watershed: Watershed,
    pub message: String,
    pub detail: BTreeMap<String, Value>,
    pub suggested_action: String,
}

/// Alert thresholds, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Problematic share above which a watershed is critical.
    pub critical_problematic_pct: f64,
    /// Rise in problematic share that raises a waterlogging alert.
    pub rising_delta_pct: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            critical_problematic_pct: DEFAULT_CRITICAL_PROBLEMATIC_PCT,
            rising_delta_pct: SIGNIFICANT_TREND_DELTA_PCT,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        if !(ELEVATED_PROBLEMATIC_PCT..=100.0).contains(&self.critical_problematic_pct) {
            return Err(HydrosatError::InvalidConfig(format!(
                "alerts.critical_problematic_pct must lie in [{ELEVATED_PROBLEMATIC_PCT}, 100], got {}",
                self.critical_problematic_pct
            )));
        }
        if self.rising_delta_pct.is_nan() || self.rising_delta_pct <= 0.0 {
            return Err(HydrosatError::InvalidConfig(format!(
                "alerts.rising_delta_pct must be positive, got {}",
                self.rising_delta_pct
            )));
        }
        Ok(())
    }
}

/// Alerts for one period with severity counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_period: Option<Period>,
    pub alerts: Vec<Alert>,
    pub total: usize,
    pub high: usize,
    pub medium: usize,
}

impl AlertReport {
    pub fn new(period: Period, reference_period: Option<Period>, alerts: Vec<Alert>) -> Self {
        let count = |s: Severity| alerts.iter().filter(|a| a.severity == s).count();
        let (high, medium) = (count(Severity::High), count(Severity::Medium));
        Self {
            period,
            reference_period,
            total: alerts.len(),
            high,
            medium,
            alerts,
        }
    }
}

/// Evaluate every watershed of `report`, plus the reference-period changes
/// when given. The output is sorted by severity, otherwise in evaluation
/// order.
pub fn generate_alerts(
    report: &WatershedReport,
    changes: Option<&BTreeMap<Watershed, ChangeReport>>,
    config: &AlertConfig,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for (&watershed, result) in &report.watersheds {
        let summary = &result.areas.summary;
        let pct = summary.problematic_pct;
        let name = watershed.display_name().to_uppercase();

        if pct > config.critical_problematic_pct {
            alerts.push(Alert {
                kind: AlertKind::CriticalArea,
                severity: Severity::High,
                watershed,
                message: format!("Watershed {name}: {pct:.1}% of the area has water problems"),
                detail: detail([
                    ("waterlogged_ha", json!(summary.waterlogged_ha)),
                    ("water_ha", json!(summary.water_ha)),
                    ("problematic_pct", json!(pct)),
                ]),
                suggested_action: "Inspect the watershed drainage system".to_string(),
            });
        } else if pct > ELEVATED_PROBLEMATIC_PCT {
            alerts.push(Alert {
                kind: AlertKind::ElevatedArea,
                severity: Severity::Medium,
                watershed,
                message: format!("Watershed {name}: {pct:.1}% of the area with problems"),
                detail: detail([
                    ("waterlogged_ha", json!(summary.waterlogged_ha)),
                    ("problematic_pct", json!(pct)),
                ]),
                suggested_action: "Monitor the evolution over the coming days".to_string(),
            });
        }
    }

    for (&watershed, change) in changes.into_iter().flatten() {
        let delta = change.trend.total_delta_pct;
        if delta > config.rising_delta_pct {
            let name = watershed.display_name().to_uppercase();
            alerts.push(Alert {
                kind: AlertKind::RisingWaterlogging,
                severity: Severity::High,
                watershed,
                message: format!("Watershed {name}: problematic area up {delta:.1}%"),
                detail: detail([
                    ("delta_pct", json!(delta)),
                    ("reference_period", json!(change.period1.to_string())),
                ]),
                suggested_action: "Check floodgates and main channels".to_string(),
            });
        }
    }

    // Stable sort keeps evaluation order within a severity.
    alerts.sort_by_key(|a| a.severity);

    info!(
        period = %report.period,
        alerts = alerts.len(),
        high = alerts.iter().filter(|a| a.severity == Severity::High).count(),
        "Alerts generated"
    );
    alerts
}

fn detail<const N: usize>(entries: [(&str, Value); N]) -> BTreeMap<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
