//! Fixed-size pool of executors running external commands.
//!
//! `size` executors share one FIFO queue. Each executor takes the first queued
//! job whose host still has a free slot in the [`HostGate`], runs it to
//! completion, and repeats; it only waits when every queued job targets a
//! full host. A failing job is recorded and the executor moves on;
//! [`WorkerPool::run`] returns when every submitted job has an outcome, or
//! early when [`Shutdown`] fires, in which case running rsyncs are killed.

mod gate;
mod report;

pub use gate::{HostGate, HostSlot};
pub use report::{JobOutcome, JobStatus, PoolReport};

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Notify;

use crate::command::Command;
use crate::lifecycle::Shutdown;

/// A command plus the host it targets.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub host: String,
    pub command: Command,
}

#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    gate: HostGate,
    shutdown: Shutdown,
}

impl WorkerPool {
    /// Pool with `size` executors (at least one) and no per-host gating.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            gate: HostGate::default(),
            shutdown: Shutdown::never(),
        }
    }

    pub fn with_host_gate(mut self, gate: HostGate) -> Self {
        self.gate = gate;
        self
    }

    /// Stop taking jobs and kill running ones when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run all jobs and wait for every one of them to finish.
    pub async fn run(self, jobs: Vec<Job>) -> PoolReport {
        let submitted = jobs.len();
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::from(jobs)),
            gate: self.gate,
            freed: Notify::new(),
        });
        let mut join_set = tokio::task::JoinSet::new();

        for worker_id in 1..=self.size {
            join_set.spawn(executor(
                worker_id,
                Arc::clone(&shared),
                self.shutdown.clone(),
            ));
        }

        let mut outcomes = Vec::with_capacity(submitted);
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(mut done) => outcomes.append(&mut done),
                Err(e) => tracing::error!("worker task join: {}", e),
            }
        }
        outcomes.sort_by_key(|o| o.id);

        let interrupted = self.shutdown.is_requested();
        if interrupted {
            tracing::warn!(
                "pool interrupted, {} of {} jobs not started",
                submitted - outcomes.len(),
                submitted
            );
        } else if outcomes.len() != submitted {
            tracing::error!(
                "{} of {} jobs did not report an outcome",
                submitted - outcomes.len(),
                submitted
            );
        }
        PoolReport {
            outcomes,
            interrupted,
        }
    }
}

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    gate: HostGate,
    /// Signalled whenever a job releases its host slot.
    freed: Notify,
}

enum Take {
    Job(Job, HostSlot),
    /// Jobs are queued but all of their hosts are at their limit.
    Blocked,
    Drained,
}

impl Shared {
    fn take_runnable(&self) -> Take {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if queue.is_empty() {
            return Take::Drained;
        }
        let runnable = queue
            .iter()
            .enumerate()
            .find_map(|(idx, job)| self.gate.try_enter(&job.host).map(|slot| (idx, slot)));
        match runnable.and_then(|(idx, slot)| queue.remove(idx).map(|job| (job, slot))) {
            Some((job, slot)) => Take::Job(job, slot),
            None => Take::Blocked,
        }
    }
}

async fn executor(worker: usize, shared: Arc<Shared>, mut shutdown: Shutdown) -> Vec<JobOutcome> {
    let mut done = Vec::new();
    while !shutdown.is_requested() {
        // Registered before looking at the queue so a slot freed in between is not missed.
        let freed = shared.freed.notified();
        tokio::pin!(freed);
        freed.as_mut().enable();

        let (job, slot) = match shared.take_runnable() {
            Take::Job(job, slot) => (job, slot),
            Take::Drained => break,
            Take::Blocked => {
                tokio::select! {
                    _ = &mut freed => continue,
                    _ = shutdown.requested() => break,
                }
            }
        };

        let started = Instant::now();
        let status = tokio::select! {
            status = run_command(worker, &job) => status,
            _ = shutdown.requested() => {
                tracing::warn!(worker, host = %job.host, "killed on shutdown: {}", job.command);
                JobStatus::Failed("interrupted".to_string())
            }
        };
        drop(slot);
        shared.freed.notify_waiters();

        done.push(JobOutcome {
            id: job.id,
            host: job.host,
            command_line: job.command.to_string(),
            worker,
            status,
            elapsed: started.elapsed(),
        });
    }
    tracing::debug!(worker, "worker finished, {} job(s) run", done.len());
    done
}

async fn run_command(worker: usize, job: &Job) -> JobStatus {
    let cmd = &job.command;
    tracing::info!(worker, host = %job.host, "execute command: {}", cmd);

    let output = tokio::process::Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            tracing::info!(worker, host = %job.host, "command successful: {}", cmd);
            JobStatus::Succeeded
        }
        Ok(out) => {
            let reason = failure_reason(out.status, &out.stderr);
            tracing::error!(worker, host = %job.host, "command fail: {}: {}", cmd, reason);
            JobStatus::Failed(reason)
        }
        Err(e) => {
            let reason = format!("cannot start {}: {}", cmd.program, e);
            tracing::error!(worker, host = %job.host, "command fail: {}: {}", cmd, reason);
            JobStatus::Failed(reason)
        }
    }
}

fn failure_reason(status: ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    match stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => format!("{}: {}", status, line),
        None => status.to_string(),
    }
}
