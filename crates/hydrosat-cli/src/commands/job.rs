use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, ValueEnum};
use hydrosat_core::jobs::{JobQueue, JobTask};
use hydrosat_core::monitor::NoOpReporter;

use super::{print_json, PeriodArgs, ServiceArgs};
use crate::progress::SpinnerReporter;

#[derive(Clone, Copy, ValueEnum)]
pub enum TaskArg {
    FloodAnalysis,
    WatershedClassification,
}

#[derive(Args)]
pub struct JobArgs {
    /// Task to run in the background queue
    #[arg(value_enum)]
    pub task: TaskArg,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(flatten)]
    pub period: PeriodArgs,
}

pub fn run(args: &JobArgs) -> Result<()> {
    let period = args.period.period()?;
    let task = match args.task {
        TaskArg::FloodAnalysis => JobTask::FloodAnalysis { period },
        TaskArg::WatershedClassification => JobTask::WatershedClassification { period },
    };

    let service = Arc::new(args.service.service(Arc::new(NoOpReporter))?);
    let jobs = service.config().jobs.clone();
    let queue = JobQueue::new(service, &jobs)?;
    let id = queue.submit(task)?;

    let spinner = SpinnerReporter::for_output(args.service.json)?;
    let snapshot = loop {
        let snapshot = queue.wait(id, Duration::from_millis(250))?;
        spinner.set_message(format!("Job {id}: {}", snapshot.status));
        if snapshot.status.is_finished() {
            break snapshot;
        }
    };
    spinner.finish();

    let value = queue.result(id)?.unwrap_or_default();
    queue.forget(id)?;
    queue.shutdown();

    if args.service.json {
        print_json(&value)
    } else {
        println!("Job {id} ({}) {}", snapshot.task, snapshot.status);
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
