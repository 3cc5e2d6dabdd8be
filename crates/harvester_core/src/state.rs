use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::{ContinuationToken, Frontier, Record, RecordStore, StopReason};

/// Circuit breaker thresholds for one harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestLimits {
    pub max_records: usize,
    pub hard_stop: Duration,
    pub idle_timeout: Duration,
    pub step_guard: usize,
    pub zero_progress_threshold: usize,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            max_records: 100_000,
            hard_stop: Duration::from_secs(5 * 60),
            idle_timeout: Duration::from_secs(8),
            step_guard: 200,
            zero_progress_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Draining,
    Done(StopReason),
    Aborted(String),
}

/// Transient state owned by exactly one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestState {
    pub(crate) phase: Phase,
    pub(crate) limits: HarvestLimits,
    pub(crate) frontier: Frontier,
    pub(crate) visited: HashSet<ContinuationToken>,
    pub(crate) store: RecordStore,
    pub(crate) steps: usize,
    pub(crate) zero_progress_streak: usize,
    pub(crate) started_at: Option<Instant>,
    pub(crate) last_progress_at: Option<Instant>,
    pub(crate) in_flight: Option<ContinuationToken>,
    pub(crate) abort_requested: bool,
}

impl HarvestState {
    pub fn new(limits: HarvestLimits) -> Self {
        Self {
            phase: Phase::Seeding,
            limits,
            frontier: Frontier::new(),
            visited: HashSet::new(),
            store: RecordStore::new(),
            steps: 0,
            zero_progress_streak: 0,
            started_at: None,
            last_progress_at: None,
            in_flight: None,
            abort_requested: false,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done(_) | Phase::Aborted(_))
    }

    pub fn limits(&self) -> &HarvestLimits {
        &self.limits
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn has_visited(&self, token: &str) -> bool {
        self.visited.contains(token)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Number of dequeue operations performed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn zero_progress_streak(&self) -> usize {
        self.zero_progress_streak
    }

    pub fn into_records(self) -> Vec<Record> {
        self.store.finalize()
    }
}
