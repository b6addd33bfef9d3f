use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use hydrosat_core::period::Period;

use super::{print_json, PeriodArgs, ServiceArgs};
use crate::progress::SpinnerReporter;
use crate::summary::print_alerts;

#[derive(Args)]
pub struct AlertsArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// Start of the reference window for rising-waterlogging alerts
    #[arg(long, requires = "reference_end")]
    pub reference_start: Option<NaiveDate>,

    /// End of the reference window, exclusive
    #[arg(long, requires = "reference_start")]
    pub reference_end: Option<NaiveDate>,
}

pub fn run(args: &AlertsArgs) -> Result<()> {
    let reference = match (args.reference_start, args.reference_end) {
        (Some(start), Some(end)) => Some(Period::new(start, end)?),
        _ => None,
    };

    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let service = args.service.service(spinner.clone())?;
    let report = service.generate_alerts(args.period.period()?, reference);
    spinner.finish();
    let report = report?;

    if args.service.json {
        print_json(&report)
    } else {
        print_alerts(&report);
        Ok(())
    }
}
