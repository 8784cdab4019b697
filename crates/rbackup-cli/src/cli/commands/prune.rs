//! `rbackup prune` – delete expired snapshots without running any transfer.

use anyhow::Result;
use rbackup_core::lifecycle::{self, RunOutcome};
use rbackup_core::pipeline::{self, Plan};
use std::path::Path;

pub async fn run_prune(config_path: &Path, lock_path: &Path, dry_run: bool) -> Result<i32> {
    let outcome = lifecycle::run_exclusive(lock_path, |_| async move {
        let plan = Plan::load(config_path, pipeline::today())?;
        Ok(plan.sweeper().dry_run(dry_run).sweep(&plan.paths))
    })
    .await?;

    match outcome {
        RunOutcome::Completed(report) => {
            let verb = if dry_run { "would remove" } else { "removed" };
            for path in &report.removed {
                println!("{} {}", verb, path.display());
            }
            for path in &report.failed {
                println!("FAILED {}", path.display());
            }
            if report.removed.is_empty() && report.failed.is_empty() {
                println!("No expired snapshots.");
            }
            Ok(0)
        }
        RunOutcome::Interrupted(sig) => Ok(sig.exit_code()),
    }
}
