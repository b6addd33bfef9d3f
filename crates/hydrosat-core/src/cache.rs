//! Single-slot, short-lived cache for the dashboard summary.
//!
//! Concurrent misses share one refresh: the first caller computes while the
//! others wait on a condition variable and receive the same outcome.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HydrosatError, Result};
use crate::monitor::DashboardSummary;

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A summary served by the cache. Serializes as the summary record with
/// a `from_cache` field alongside.
#[derive(Clone, Debug, Serialize)]
pub struct CachedSummary {
    #[serde(flatten)]
    pub summary: Arc<DashboardSummary>,
    /// True when served from a still-valid entry.
    pub from_cache: bool,
}

struct Entry {
    summary: Arc<DashboardSummary>,
    expires_at: Instant,
}

/// Outcome of a finished refresh as seen by waiters: the payload or the
/// failure's code and safe message.
type SharedOutcome = std::result::Result<Arc<DashboardSummary>, (String, String)>;

#[derive(Default)]
struct State {
    entry: Option<Entry>,
    refreshing: bool,
    /// Incremented each time a refresh finishes.
    generation: u64,
    last_outcome: Option<SharedOutcome>,
}

pub struct DashboardCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    refreshed: Condvar,
}

impl DashboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            state: Mutex::new(State::default()),
            refreshed: Condvar::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Expiry of the stored entry, if any.
    pub fn expires_at(&self) -> Option<Instant> {
        self.lock().entry.as_ref().map(|e| e.expires_at)
    }

    /// Drop the stored entry.
    pub fn invalidate(&self) {
        self.lock().entry = None;
    }

    /// Serve the stored summary while `now < expiry`; otherwise run
    /// `refresh` (or wait for the refresh already in flight). The entry is
    /// replaced only when the refresh succeeds.
    pub fn get_or_refresh<F>(&self, refresh: F) -> Result<CachedSummary>
    where
        F: FnOnce() -> Result<DashboardSummary>,
    {
        let mut state = self.lock();
        loop {
            if let Some(entry) = &state.entry {
                if self.clock.now() < entry.expires_at {
                    debug!("Dashboard cache hit");
                    return Ok(CachedSummary {
                        summary: Arc::clone(&entry.summary),
                        from_cache: true,
                    });
                }
            }
            if !state.refreshing {
                break;
            }

            let waiting_for = state.generation;
            while state.refreshing && state.generation == waiting_for {
                state = self
                    .refreshed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if state.generation != waiting_for {
                return match &state.last_outcome {
                    Some(Ok(summary)) => Ok(CachedSummary {
                        summary: Arc::clone(summary),
                        from_cache: false,
                    }),
                    Some(Err((code, message))) => Err(HydrosatError::RefreshFailed {
                        code: code.clone(),
                        message: message.clone(),
                    }),
                    None => continue,
                };
            }
        }

        state.refreshing = true;
        drop(state);
        info!("Dashboard cache miss, refreshing");

        let mut flight = Flight {
            cache: self,
            finished: false,
        };
        let outcome = refresh();

        let mut state = self.lock();
        flight.finished = true;
        let result = match outcome {
            Ok(summary) => {
                let summary = Arc::new(summary);
                let expires_at = self.clock.now() + self.ttl;
                state.entry = Some(Entry {
                    summary: Arc::clone(&summary),
                    expires_at,
                });
                state.last_outcome = Some(Ok(Arc::clone(&summary)));
                info!(ttl_s = self.ttl.as_secs(), "Dashboard cache refreshed");
                Ok(CachedSummary {
                    summary,
                    from_cache: false,
                })
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "Dashboard refresh failed, cache left unchanged");
                state.last_outcome = Some(Err((e.code().to_string(), e.safe_message())));
                Err(e)
            }
        };
        finish_flight(&mut state);
        drop(state);
        self.refreshed.notify_all();
        result
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn finish_flight(state: &mut State) {
    state.refreshing = false;
    state.generation += 1;
}

/// Releases waiters if the refresh closure unwinds.
struct Flight<'a> {
    cache: &'a DashboardCache,
    finished: bool,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.cache.lock();
        state.last_outcome = Some(Err((
            "DASHBOARD_REFRESH_FAILED".to_string(),
            "The dashboard refresh was aborted".to_string(),
        )));
        finish_flight(&mut state);
        drop(state);
        self.cache.refreshed.notify_all();
    }
}
