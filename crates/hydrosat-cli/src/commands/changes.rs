use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use hydrosat_core::period::Period;
use hydrosat_core::region::RegionSelector;

use super::{print_json, ServiceArgs};
use crate::progress::SpinnerReporter;
use crate::summary::print_changes;

#[derive(Args)]
pub struct ChangesArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Region key: zona, candil, ml, noroeste or norte
    #[arg(long, default_value = "zona")]
    pub region: RegionSelector,

    /// Start of the earlier window (YYYY-MM-DD)
    #[arg(long)]
    pub before_start: NaiveDate,

    /// End of the earlier window, exclusive
    #[arg(long)]
    pub before_end: NaiveDate,

    /// Start of the later window
    #[arg(long)]
    pub after_start: NaiveDate,

    /// End of the later window, exclusive
    #[arg(long)]
    pub after_end: NaiveDate,
}

pub fn run(args: &ChangesArgs) -> Result<()> {
    let before = Period::new(args.before_start, args.before_end)?;
    let after = Period::new(args.after_start, args.after_end)?;

    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let service = args.service.service(spinner.clone())?;
    let report = service.detect_changes(&args.region, before, after);
    spinner.finish();
    let report = report?;

    if args.service.json {
        print_json(&report)
    } else {
        print_changes(&report);
        Ok(())
    }
}
