use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use hydrosat_core::monitor::{PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Default)]
struct StageState {
    stage: Option<PipelineStage>,
    total: Option<usize>,
    done: usize,
}

/// Spinner showing the current pipeline stage on stderr.
pub struct SpinnerReporter {
    bar: ProgressBar,
    state: Mutex<StageState>,
}

impl SpinnerReporter {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(Self {
            bar,
            state: Mutex::new(StageState::default()),
        })
    }

    /// Spinner that draws nothing, for JSON output.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            state: Mutex::new(StageState::default()),
        }
    }

    /// Visible spinner for summaries, hidden one for JSON output.
    pub fn for_output(json: bool) -> Result<Arc<Self>> {
        Ok(Arc::new(if json { Self::hidden() } else { Self::new()? }))
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn redraw(&self, state: &StageState) {
        let Some(stage) = state.stage else {
            return;
        };
        match state.total {
            Some(total) => self.bar.set_message(format!("{stage} ({}/{total})", state.done)),
            None => self.bar.set_message(stage.to_string()),
        }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = StageState {
            stage: Some(stage),
            total: total_items,
            done: 0,
        };
        self.redraw(&state);
    }

    fn advance(&self, items_done: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.done += items_done;
        self.redraw(&state);
    }
}
