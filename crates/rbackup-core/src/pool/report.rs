//! Per-job outcomes collected by the worker pool.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    /// Exit status and the last line rsync wrote to stderr, or the spawn error.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Position in the submitted job list.
    pub id: usize,
    pub host: String,
    pub command_line: String,
    pub worker: usize,
    pub status: JobStatus,
    pub elapsed: Duration,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Every submitted job appears exactly once, sorted by `id`, unless the run
/// was interrupted; then jobs that never started are missing.
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub outcomes: Vec<JobOutcome>,
    pub interrupted: bool,
}

impl PoolReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}
