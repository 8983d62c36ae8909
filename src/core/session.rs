//! Per-connection session state.
//!
//! A session owns the generation counter that decides which pipeline run is
//! "current". The counter is bumped only when a transcript is accepted;
//! in-flight runs read it (never write it) to self-check staleness, so no
//! lock is needed on the hot path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use super::run::{PipelineRun, RunStatus};

/// Per-connection state: identity, current generation, cancellation flag,
/// and a small registry of live runs keyed by generation.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    generation: AtomicU64,
    cancelled: AtomicBool,
    runs: Mutex<HashMap<u64, RunStatus>>,
}

impl Session {
    /// Create a session for a newly established connection.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            generation: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The generation of the current run. Zero means no transcript has been
    /// accepted yet.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether `generation` still identifies the current run.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation && !self.is_cancelled()
    }

    /// Accept a transcript: bump the generation, supersede every live run,
    /// prune terminal ones, and hand back the new run.
    ///
    /// This is the only place the generation counter is written.
    pub fn begin_run(&self, transcript: String) -> PipelineRun {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let mut runs = self.runs.lock();
        runs.retain(|_, status| !status.is_terminal());
        for status in runs.values_mut() {
            *status = RunStatus::Superseded;
        }
        runs.insert(generation, RunStatus::PendingGeneration);

        PipelineRun::new(self.id, generation, transcript)
    }

    /// Record a status transition for a run. Superseded runs keep their
    /// status; a stale run task observing its own supersession must not
    /// overwrite it.
    pub fn set_run_status(&self, generation: u64, status: RunStatus) {
        let mut runs = self.runs.lock();
        if let Some(existing) = runs.get_mut(&generation) {
            if *existing == RunStatus::Superseded && status != RunStatus::Superseded {
                return;
            }
            *existing = status;
        }
    }

    pub fn run_status(&self, generation: u64) -> Option<RunStatus> {
        self.runs.lock().get(&generation).copied()
    }

    /// Number of runs that have not reached a terminal state.
    pub fn active_runs(&self) -> usize {
        self.runs
            .lock()
            .values()
            .filter(|status| !status.is_terminal())
            .count()
    }

    /// Tear down the session on disconnect. In-flight runs observe the flag
    /// at their next emission check and stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
