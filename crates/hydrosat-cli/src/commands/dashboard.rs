use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use hydrosat_core::cache::DashboardCache;

use super::{print_json, ServiceArgs};
use crate::progress::SpinnerReporter;
use crate::summary::print_dashboard;

#[derive(Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Last day of the summarised window, exclusive (defaults to today, UTC)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Window length in days (defaults to the configured value)
    #[arg(long)]
    pub days: Option<i64>,

    /// Serve the summary this many times through the cache
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Seconds between repeats
    #[arg(long, default_value = "0")]
    pub interval: u64,
}

pub fn run(args: &DashboardArgs) -> Result<()> {
    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let service = args.service.service(spinner.clone())?;
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let days = args.days.unwrap_or(service.config().dashboard.days_back);
    let cache = DashboardCache::new(Duration::from_secs(service.config().dashboard.ttl_secs));

    for i in 0..args.repeat.max(1) {
        if i > 0 && args.interval > 0 {
            std::thread::sleep(Duration::from_secs(args.interval));
        }
        let served = cache.get_or_refresh(|| service.monitoring_summary(today, days));
        spinner.finish();
        let served = served?;

        if args.service.json {
            print_json(&served)?;
        } else {
            print_dashboard(&served.summary, served.from_cache);
        }
    }
    Ok(())
}
