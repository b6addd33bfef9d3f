//! Background job runner for long classification passes.
//!
//! Jobs run on a fixed pool of worker threads fed through a channel. A job
//! that runs past the configured limit is reported as failed; whatever it
//! returns afterwards is discarded.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HydrosatError, Result};
use crate::monitor::{ClassificationRequest, JobConfig, MonitoringService};
use crate::period::Period;
use crate::region::RegionSelector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = HydrosatError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| HydrosatError::JobNotFound(s.to_string()))
    }
}

/// Work a job performs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum JobTask {
    /// Classification of the whole consortium zone.
    FloodAnalysis { period: Period },
    /// Cross-watershed classification.
    WatershedClassification { period: Period },
}

impl JobTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FloodAnalysis { .. } => "flood_analysis",
            Self::WatershedClassification { .. } => "watershed_classification",
        }
    }

    /// Build a task from its name and JSON arguments.
    pub fn from_named(name: &str, args: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut fields) = args else {
            return Err(HydrosatError::UnknownTask(format!(
                "{name}: arguments must be a JSON object"
            )));
        };
        match name {
            "flood_analysis" | "watershed_classification" => {
                fields.insert("task".to_string(), serde_json::Value::String(name.to_string()));
                Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
            }
            other => Err(HydrosatError::UnknownTask(other.to_string())),
        }
    }
}

/// Executes job tasks. Implemented by the monitoring service.
pub trait JobRunner: Send + Sync {
    fn run(&self, task: &JobTask) -> Result<serde_json::Value>;
}

impl JobRunner for MonitoringService {
    fn run(&self, task: &JobTask) -> Result<serde_json::Value> {
        match task {
            JobTask::FloodAnalysis { period } => {
                let result = self.classify(&ClassificationRequest::new(RegionSelector::Zone, *period))?;
                Ok(serde_json::to_value(result)?)
            }
            JobTask::WatershedClassification { period } => {
                Ok(serde_json::to_value(self.classify_watersheds(*period)?)?)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

/// Point-in-time view of a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub task: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub error: Option<JobError>,
}

struct JobEntry {
    task: JobTask,
    status: JobStatus,
    submitted_at: DateTime<Utc>,
    started: Option<Instant>,
    result: Option<serde_json::Value>,
    error: Option<JobError>,
}

impl JobEntry {
    /// Fail a running job that is past its limit.
    fn enforce_timeout(&mut self, timeout: Duration) {
        if self.status != JobStatus::Running {
            return;
        }
        if self.started.is_some_and(|t| t.elapsed() > timeout) {
            self.fail_timeout(timeout);
        }
    }

    fn fail_timeout(&mut self, timeout: Duration) {
        let err = HydrosatError::JobTimeout {
            seconds: timeout.as_secs(),
        };
        self.status = JobStatus::Failed;
        self.result = None;
        self.error = Some(JobError {
            code: err.code().to_string(),
            message: err.safe_message(),
        });
    }
}

type JobTable = Arc<Mutex<HashMap<JobId, JobEntry>>>;

/// Fixed-size pool of job workers.
pub struct JobQueue {
    sender: Option<mpsc::Sender<JobId>>,
    jobs: JobTable,
    timeout: Duration,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    pub fn new(runner: Arc<dyn JobRunner>, config: &JobConfig) -> Result<Self> {
        Self::with_limits(runner, config.workers, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_limits(runner: Arc<dyn JobRunner>, workers: usize, timeout: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<JobId>();
        let rx = Arc::new(Mutex::new(rx));
        let jobs: JobTable = Arc::new(Mutex::new(HashMap::new()));

        let workers = (0..workers.max(1))
            .map(|i| {
                let rx = Arc::clone(&rx);
                let jobs = Arc::clone(&jobs);
                let runner = Arc::clone(&runner);
                std::thread::Builder::new()
                    .name(format!("hydrosat-job-{i}"))
                    .spawn(move || worker_loop(&rx, &jobs, runner.as_ref(), timeout))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        info!(workers = workers.len(), timeout_s = timeout.as_secs(), "Job queue started");
        Ok(Self {
            sender: Some(tx),
            jobs,
            timeout,
            workers,
        })
    }

    /// Enqueue a task and return its id immediately.
    pub fn submit(&self, task: JobTask) -> Result<JobId> {
        let id = JobId::new();
        let name = task.name();
        lock(&self.jobs).insert(
            id,
            JobEntry {
                task,
                status: JobStatus::Pending,
                submitted_at: Utc::now(),
                started: None,
                result: None,
                error: None,
            },
        );

        let sent = self.sender.as_ref().map(|tx| tx.send(id));
        if !matches!(sent, Some(Ok(()))) {
            lock(&self.jobs).remove(&id);
            return Err(HydrosatError::Backend("job queue is shut down".to_string()));
        }
        info!(job = %id, task = name, "Job submitted");
        Ok(id)
    }

    /// Enqueue a task given by name and JSON arguments.
    pub fn submit_named(&self, name: &str, args: serde_json::Value) -> Result<JobId> {
        self.submit(JobTask::from_named(name, args)?)
    }

    pub fn status(&self, id: JobId) -> Result<JobSnapshot> {
        let mut jobs = lock(&self.jobs);
        let entry = jobs
            .get_mut(&id)
            .ok_or_else(|| HydrosatError::JobNotFound(id.to_string()))?;
        entry.enforce_timeout(self.timeout);
        Ok(JobSnapshot {
            id,
            task: entry.task.name().to_string(),
            status: entry.status,
            submitted_at: entry.submitted_at,
            error: entry.error.clone(),
        })
    }

    /// The job's output once it succeeded, `None` while it is still queued
    /// or running, and `JobFailed` when it failed.
    pub fn result(&self, id: JobId) -> Result<Option<serde_json::Value>> {
        let mut jobs = lock(&self.jobs);
        let entry = jobs
            .get_mut(&id)
            .ok_or_else(|| HydrosatError::JobNotFound(id.to_string()))?;
        entry.enforce_timeout(self.timeout);
        match entry.status {
            JobStatus::Pending | JobStatus::Running => Ok(None),
            JobStatus::Succeeded => Ok(entry.result.clone()),
            JobStatus::Failed => {
                let error = entry.error.clone().unwrap_or(JobError {
                    code: "JOB_FAILED".to_string(),
                    message: "The job failed".to_string(),
                });
                Err(HydrosatError::JobFailed {
                    id: id.to_string(),
                    code: error.code,
                    message: error.message,
                })
            }
        }
    }

    /// Poll until the job finishes or `limit` elapses, returning the last
    /// snapshot either way.
    pub fn wait(&self, id: JobId, limit: Duration) -> Result<JobSnapshot> {
        let deadline = Instant::now() + limit;
        loop {
            let snapshot = self.status(id)?;
            if snapshot.status.is_finished() || Instant::now() >= deadline {
                return Ok(snapshot);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Drop a finished job and its result from the table. Returns `false`
    /// and keeps the entry while the job is still queued or running.
    pub fn forget(&self, id: JobId) -> Result<bool> {
        let mut jobs = lock(&self.jobs);
        let entry = jobs
            .get_mut(&id)
            .ok_or_else(|| HydrosatError::JobNotFound(id.to_string()))?;
        entry.enforce_timeout(self.timeout);
        if !entry.status.is_finished() {
            return Ok(false);
        }
        jobs.remove(&id);
        debug!(job = %id, "Job forgotten");
        Ok(true)
    }

    /// Stop accepting jobs and wait for the workers to drain the queue.
    pub fn shutdown(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    rx: &Mutex<mpsc::Receiver<JobId>>,
    jobs: &Mutex<HashMap<JobId, JobEntry>>,
    runner: &dyn JobRunner,
    timeout: Duration,
) {
    loop {
        let next = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(id) = next else {
            break;
        };

        let task = {
            let mut table = lock(jobs);
            let Some(entry) = table.get_mut(&id) else {
                continue;
            };
            entry.status = JobStatus::Running;
            entry.started = Some(Instant::now());
            entry.task.clone()
        };
        debug!(job = %id, task = task.name(), "Job started");

        let outcome = runner.run(&task);

        let mut table = lock(jobs);
        let Some(entry) = table.get_mut(&id) else {
            continue;
        };
        let elapsed = entry.started.map(|t| t.elapsed()).unwrap_or_default();
        if entry.status == JobStatus::Failed || elapsed > timeout {
            entry.fail_timeout(timeout);
            warn!(job = %id, elapsed_s = elapsed.as_secs(), "Job exceeded its time limit, result discarded");
            continue;
        }
        match outcome {
            Ok(value) => {
                entry.status = JobStatus::Succeeded;
                entry.result = Some(value);
                info!(job = %id, elapsed_ms = elapsed.as_millis() as u64, "Job succeeded");
            }
            Err(e) => {
                warn!(job = %id, code = e.code(), error = %e, "Job failed");
                entry.status = JobStatus::Failed;
                entry.error = Some(JobError {
                    code: e.code().to_string(),
                    message: e.safe_message(),
                });
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
