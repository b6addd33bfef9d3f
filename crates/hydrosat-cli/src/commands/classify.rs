use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hydrosat_core::monitor::ClassificationRequest;
use hydrosat_core::region::{Region, RegionSelector};

use super::{print_json, MethodArg, PeriodArgs, ServiceArgs};
use crate::progress::SpinnerReporter;
use crate::summary::print_classification;

#[derive(Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// Region key: zona, candil, ml, noroeste or norte
    #[arg(long, default_value = "zona")]
    pub region: RegionSelector,

    /// Custom area as min_x,min_y,max_x,max_y (overrides --region)
    #[arg(long, value_delimiter = ',', num_args = 4)]
    pub bbox: Option<Vec<f64>>,

    /// Reject scenes at or above this cloud cover (percent)
    #[arg(long)]
    pub max_cloud: Option<f32>,

    /// Compositing method
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Write class polygons as GeoJSON to this file
    #[arg(long)]
    pub geojson: Option<PathBuf>,
}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let service = args.service.service(spinner.clone())?;

    let region = match args.bbox.as_deref() {
        Some(&[min_x, min_y, max_x, max_y]) => {
            RegionSelector::Custom(Region::from_rect("custom", (min_x, min_y), (max_x, max_y)))
        }
        Some(_) => anyhow::bail!("--bbox needs exactly four values"),
        None => args.region.clone(),
    };

    let mut request = ClassificationRequest::new(region, args.period.period()?);
    if let Some(pct) = args.max_cloud {
        request = request.with_max_cloud(pct);
    }
    if let Some(method) = args.method {
        request = request.with_method(method.into());
    }
    if args.geojson.is_some() {
        request = request.with_vectors();
    }

    let result = service.classify(&request);
    spinner.finish();
    let result = result?;

    if let Some(ref path) = args.geojson {
        match result.areas.geojson {
            Some(ref fc) => {
                std::fs::write(path, serde_json::to_string(fc)?)
                    .with_context(|| format!("Failed to write GeoJSON to {}", path.display()))?;
            }
            None => tracing::warn!("Vector output omitted, {} not written", path.display()),
        }
    }

    if args.service.json {
        print_json(&result)
    } else {
        print_classification(&result);
        Ok(())
    }
}
