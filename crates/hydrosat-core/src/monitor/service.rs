use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::aggregate::{aggregate, AggregationOptions};
use crate::alerts::{generate_alerts, AlertReport};
use crate::change::ChangeReport;
use crate::classify::{classify, ClassificationThresholds};
use crate::composite::{build_composite, CompositeMethod, CompositeRequest};
use crate::consts::DASHBOARD_TOP_ALERTS;
use crate::error::{HydrosatError, Result};
use crate::imagery::{ImageryProvider, TimedProvider};
use crate::indices::compute_indices;
use crate::period::Period;
use crate::region::{Region, RegionCatalog, RegionSelector, Watershed};
use crate::report::{ClassificationResult, RunParameters, SkippedWatershed, WatershedReport};

use super::config::MonitorConfig;
use super::types::{
    ClassificationRequest, DashboardSummary, GeneralState, NoOpReporter, PipelineStage,
    ProgressReporter, SummaryPeriod,
};

/// Runs the monitoring pipeline against one imagery provider and region
/// catalog. Construct once and share by reference or `Arc`.
pub struct MonitoringService {
    provider: Arc<dyn ImageryProvider>,
    catalog: RegionCatalog,
    config: MonitorConfig,
    reporter: Arc<dyn ProgressReporter>,
}

/// Fully resolved settings for one classification.
struct RunSettings<'a> {
    max_cloud_pct: f32,
    method: CompositeMethod,
    thresholds: &'a ClassificationThresholds,
    aggregation: AggregationOptions,
}

impl MonitoringService {
    /// Validates `config` and bounds every provider call by the configured
    /// backend timeout.
    pub fn new(
        provider: Arc<dyn ImageryProvider>,
        catalog: RegionCatalog,
        config: MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.imagery.backend_timeout_secs);
        Ok(Self {
            provider: Arc::new(TimedProvider::new(provider, timeout)),
            catalog,
            config,
            reporter: Arc::new(NoOpReporter),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Classify one region over one period.
    pub fn classify(&self, request: &ClassificationRequest) -> Result<ClassificationResult> {
        let region = self.catalog.resolve(&request.region)?;
        let thresholds = request.thresholds.as_ref().unwrap_or(&self.config.thresholds);
        thresholds.validate()?;
        let settings = RunSettings {
            max_cloud_pct: request.max_cloud_pct.unwrap_or(self.config.imagery.max_cloud_pct),
            method: request.method.unwrap_or(self.config.imagery.method),
            thresholds,
            aggregation: AggregationOptions {
                vectorize: request.vectorize,
                ..self.config.aggregation.clone()
            },
        };
        self.run(&region, request.period, &settings, true)
    }

    /// Classify every watershed for `period`. A failing watershed is listed
    /// in `skipped` and the rest are still returned; only when all fail is
    /// the first failure returned as the error.
    pub fn classify_watersheds(&self, period: Period) -> Result<WatershedReport> {
        let settings = self.default_settings();
        let regions: Vec<(Watershed, &Region)> = self.catalog.watersheds().collect();

        self.reporter
            .begin_stage(PipelineStage::Classifying, Some(regions.len()));
        let outcomes: Vec<(Watershed, Result<ClassificationResult>)> = regions
            .par_iter()
            .map(|&(watershed, region)| {
                let outcome = self.run(region, period, &settings, false);
                self.reporter.advance(1);
                (watershed, outcome)
            })
            .collect();
        self.reporter.finish_stage();

        let mut results = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut first_error = None;
        for (watershed, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    results.insert(watershed, result);
                }
                Err(e) => {
                    warn!(watershed = %watershed, code = e.code(), error = %e, "Watershed skipped");
                    skipped.push(SkippedWatershed::new(watershed, &e));
                    first_error.get_or_insert(e);
                }
            }
        }

        if results.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let report = WatershedReport::new(period, results, skipped);
        info!(
            period = %period,
            classified = report.watersheds.len(),
            skipped = report.skipped.len(),
            "Watershed classification complete"
        );
        Ok(report)
    }

    /// Classify `region` over `before` and `after` and diff the results.
    /// A failure in either period is returned tagged with its period number.
    pub fn detect_changes(
        &self,
        region: &RegionSelector,
        before: Period,
        after: Period,
    ) -> Result<ChangeReport> {
        let resolved = self.catalog.resolve(region)?;
        let settings = self.default_settings();

        let first = self
            .run(&resolved, before, &settings, true)
            .map_err(|e| period_failed(1, e))?;
        let second = self
            .run(&resolved, after, &settings, true)
            .map_err(|e| period_failed(2, e))?;

        self.reporter.begin_stage(PipelineStage::ComparingPeriods, None);
        let report = ChangeReport::between(&first, &second);
        self.reporter.finish_stage();
        Ok(report)
    }

    /// Classify all watersheds for `period` and raise alerts, comparing with
    /// `reference` when given.
    pub fn generate_alerts(&self, period: Period, reference: Option<Period>) -> Result<AlertReport> {
        let current = self.classify_watersheds(period)?;
        self.alerts_for(&current, reference)
    }

    /// Raise alerts from an existing watershed pass. Only the reference
    /// period, if any, is classified here.
    pub fn alerts_for(&self, current: &WatershedReport, reference: Option<Period>) -> Result<AlertReport> {
        let changes = match reference {
            Some(reference) => Some(self.reference_changes(current, reference)),
            None => None,
        };

        self.reporter.begin_stage(PipelineStage::GeneratingAlerts, None);
        let alerts = generate_alerts(current, changes.as_ref(), &self.config.alerts);
        self.reporter.finish_stage();
        Ok(AlertReport::new(current.period, reference, alerts))
    }

    /// Dashboard payload for the `days_back` days ending at `today`: zone
    /// classification, per-watershed ranking and the top alerts.
    pub fn monitoring_summary(&self, today: NaiveDate, days_back: i64) -> Result<DashboardSummary> {
        let period = Period::trailing(today, days_back)?;
        let zone = self.classify(&ClassificationRequest::new(RegionSelector::Zone, period))?;
        let watersheds = self.classify_watersheds(period)?;
        let alert_report = self.alerts_for(&watersheds, None)?;

        let summary = DashboardSummary {
            general_state: GeneralState {
                area_total_ha: zone.areas.area_total_ha,
                productive_ha: zone.areas.summary.productive_ha,
                problematic_ha: zone.areas.summary.problematic_ha,
                problematic_pct: zone.problematic_pct(),
                images_processed: zone.images_processed,
                approximate: zone.areas.approximate,
            },
            class_breakdown: zone.areas.classes.clone(),
            top_alerts: alert_report
                .alerts
                .iter()
                .take(DASHBOARD_TOP_ALERTS)
                .cloned()
                .collect(),
            total_alert_count: alert_report.total,
            watershed_ranking: watersheds.ranking.clone(),
            skipped: watersheds.skipped.clone(),
            period: SummaryPeriod {
                start: period.start,
                end: period.end,
                days: period.days(),
            },
            generated_at: Utc::now(),
        };
        info!(
            period = %period,
            alerts = summary.total_alert_count,
            problematic_pct = summary.general_state.problematic_pct,
            "Monitoring summary built"
        );
        Ok(summary)
    }

    fn default_settings(&self) -> RunSettings<'_> {
        RunSettings {
            max_cloud_pct: self.config.imagery.max_cloud_pct,
            method: self.config.imagery.method,
            thresholds: &self.config.thresholds,
            aggregation: AggregationOptions {
                vectorize: false,
                ..self.config.aggregation.clone()
            },
        }
    }

    fn reference_changes(
        &self,
        current: &WatershedReport,
        reference: Period,
    ) -> BTreeMap<Watershed, ChangeReport> {
        let settings = self.default_settings();
        current
            .watersheds
            .par_iter()
            .filter_map(|(&watershed, after)| {
                let region = self.catalog.watershed(watershed).ok()?;
                match self.run(region, reference, &settings, false) {
                    Ok(before) => Some((watershed, ChangeReport::between(&before, after))),
                    Err(e) => {
                        warn!(
                            watershed = %watershed,
                            code = e.code(),
                            "Reference period unavailable, change alerts skipped"
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Composite, index, classify and aggregate one region. `report_stages`
    /// is off inside parallel fan-outs so stage events do not interleave.
    fn run(
        &self,
        region: &Region,
        period: Period,
        settings: &RunSettings,
        report_stages: bool,
    ) -> Result<ClassificationResult> {
        let stage = |s: PipelineStage| {
            if report_stages {
                self.reporter.begin_stage(s, None);
            }
        };
        let done = || {
            if report_stages {
                self.reporter.finish_stage();
            }
        };

        stage(PipelineStage::Compositing);
        let composite = build_composite(
            self.provider.as_ref(),
            &CompositeRequest {
                region,
                period,
                max_cloud_pct: settings.max_cloud_pct,
                method: settings.method,
            },
        );
        done();
        let composite = composite?;

        stage(PipelineStage::ComputingIndices);
        let indices = compute_indices(&composite.image);
        done();
        let indices = indices?;

        stage(PipelineStage::Classifying);
        let classes = classify(&indices, settings.thresholds);
        done();

        stage(PipelineStage::Aggregating);
        let areas = aggregate(&classes, region, &settings.aggregation);
        done();

        Ok(ClassificationResult {
            region: region.name.clone(),
            period,
            region_area_ha: region.reference_area_ha,
            areas,
            images_processed: composite.scene_count,
            acquisition_dates: composite.image.acquisition_dates().to_vec(),
            parameters: RunParameters {
                max_cloud_pct: settings.max_cloud_pct,
                method: composite.method,
                product: composite.image.product(),
                sensor: composite.image.sensor().to_string(),
                thresholds: settings.thresholds.clone(),
            },
        })
    }
}

fn period_failed(period: u8, source: HydrosatError) -> HydrosatError {
    HydrosatError::PeriodFailed {
        period,
        source: Box::new(source),
    }
}
