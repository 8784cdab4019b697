//! One backup run, end to end:
//! resolve -> order -> build commands -> create targets -> worker pool -> retention sweep.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

use crate::command::{Command, CommandBuilder};
use crate::config::{self, RawConfig};
use crate::layout;
use crate::lifecycle::Shutdown;
use crate::order;
use crate::pool::{HostGate, Job, PoolReport, WorkerPool};
use crate::resolve::{self, ResolvedPath, Settings};
use crate::retention::{RetentionSweeper, SweepReport};

/// Today's date on the local calendar; names the snapshot directory of this run.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Everything decided before anything runs. `paths[i]` produced `commands[i]`.
#[derive(Debug, Clone)]
pub struct Plan {
    pub settings: Settings,
    /// Host-interleaved execution order.
    pub paths: Vec<ResolvedPath>,
    pub commands: Vec<Command>,
    pub today: NaiveDate,
}

impl Plan {
    pub fn from_config(raw: &RawConfig, today: NaiveDate) -> Result<Self> {
        let resolved = resolve::resolve(raw)?;
        let paths = order::interleave_hosts(resolved.paths);
        let commands = CommandBuilder::new(&resolved.settings, today).build_all(&paths);
        Ok(Self {
            settings: resolved.settings,
            paths,
            commands,
            today,
        })
    }

    pub fn load(config_path: &Path, today: NaiveDate) -> Result<Self> {
        let raw = config::load_from_path(config_path)?;
        Self::from_config(&raw, today)
            .with_context(|| format!("invalid config {}", config_path.display()))
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.paths
            .iter()
            .zip(&self.commands)
            .enumerate()
            .map(|(id, (p, cmd))| Job {
                id,
                host: p.host.clone(),
                command: cmd.clone(),
            })
            .collect()
    }

    pub fn sweeper(&self) -> RetentionSweeper<'_> {
        RetentionSweeper::new(&self.settings.root_dir, self.today)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub jobs: PoolReport,
    pub sweep: SweepReport,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} ok, {} failed, {} snapshot(s) removed, {} removal(s) failed",
            self.jobs.succeeded(),
            self.jobs.failed(),
            self.sweep.removed.len(),
            self.sweep.failed.len()
        )
    }
}

/// Run every transfer with the global concurrency limit, then sweep expired snapshots.
/// Job failures are reported, never returned as errors.
///
/// When `shutdown` fires, running rsyncs are killed, queued ones never start
/// and the sweep is skipped.
pub async fn execute(plan: &Plan, shutdown: Shutdown) -> RunReport {
    let root = &plan.settings.root_dir;
    layout::ensure_target_dirs(root, &plan.paths);

    let pool = WorkerPool::new(plan.settings.concurrency_limit as usize)
        .with_host_gate(HostGate::from_paths(&plan.paths))
        .with_shutdown(shutdown);
    tracing::info!(
        workers = pool.size(),
        "starting {} rsync job(s)",
        plan.commands.len()
    );
    let jobs = pool.run(plan.jobs()).await;
    for failed in jobs.failures() {
        tracing::warn!(host = %failed.host, "job failed: {}", failed.command_line);
    }

    if jobs.interrupted {
        tracing::warn!("run interrupted, skipping retention sweep");
        return RunReport {
            jobs,
            sweep: SweepReport::default(),
        };
    }

    let sweep = plan.sweeper().sweep(&plan.paths);
    let report = RunReport { jobs, sweep };
    tracing::info!("run finished: {}", report.summary());
    report
}
