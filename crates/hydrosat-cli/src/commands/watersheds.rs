use anyhow::Result;
use clap::Args;

use super::{print_json, PeriodArgs, ServiceArgs};
use crate::progress::SpinnerReporter;
use crate::summary::print_watersheds;

#[derive(Args)]
pub struct WatershedsArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub period: PeriodArgs,
}

pub fn run(args: &WatershedsArgs) -> Result<()> {
    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let service = args.service.service(spinner.clone())?;

    let report = service.classify_watersheds(args.period.period()?);
    spinner.finish();
    let report = report?;

    if args.service.json {
        print_json(&report)
    } else {
        print_watersheds(&report);
        Ok(())
    }
}
