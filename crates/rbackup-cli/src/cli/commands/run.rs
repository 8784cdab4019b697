//! `rbackup run` – run every backup job, then sweep expired snapshots.

use anyhow::Result;
use rbackup_core::lifecycle::{self, RunOutcome};
use rbackup_core::pipeline::{self, Plan};
use std::path::Path;

pub async fn run_backup(config_path: &Path, lock_path: &Path, dry_run: bool) -> Result<i32> {
    let outcome = lifecycle::run_exclusive(lock_path, |shutdown| async move {
        let plan = Plan::load(config_path, pipeline::today())?;
        if dry_run {
            for cmd in &plan.commands {
                println!("{}", cmd);
            }
            return Ok(None);
        }
        Ok(Some(pipeline::execute(&plan, shutdown).await))
    })
    .await?;

    match outcome {
        RunOutcome::Completed(Some(report)) => {
            for failed in report.jobs.failures() {
                println!("FAILED {}: {}", failed.host, failed.command_line);
            }
            println!("{}", report.summary());
            Ok(0)
        }
        RunOutcome::Completed(None) => Ok(0),
        RunOutcome::Interrupted(sig) => {
            eprintln!("rbackup: interrupted ({:?}), lock released", sig);
            Ok(sig.exit_code())
        }
    }
}
