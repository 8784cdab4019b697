//! Build one rsync invocation per resolved path.
//!
//! Pure construction: no I/O, no failure modes. The date is injected so the
//! output is deterministic for a given day.

use chrono::NaiveDate;
use std::fmt;

use crate::layout;
use crate::resolve::{ResolvedPath, Settings};

/// Archive, hard links, ACLs and xattrs.
const ARCHIVE_FLAGS: &str = "-avHAX";

/// An executable plus its argument vector. Built once, run once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds rsync commands for one run day.
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    settings: &'a Settings,
    today: NaiveDate,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(settings: &'a Settings, today: NaiveDate) -> Self {
        Self { settings, today }
    }

    /// Source address: `[user@]host:path/`. The trailing slash makes rsync copy
    /// the directory's contents into `current/` rather than a nested directory.
    pub fn source(p: &ResolvedPath) -> String {
        match &p.login_user {
            Some(user) => format!("{}@{}:{}/", user, p.host, p.path),
            None => format!("{}:{}/", p.host, p.path),
        }
    }

    pub fn log_file(&self, host: &str) -> String {
        format!("{}.{}.log", self.settings.rsync_log_prefix, host)
    }

    pub fn build(&self, p: &ResolvedPath) -> Command {
        let root = &self.settings.root_dir;
        let mut args = vec![
            ARCHIVE_FLAGS.to_string(),
            "--delete".to_string(),
            "--backup".to_string(),
            format!("--backup-dir={}", layout::snapshot_dir(root, p, self.today)),
            format!("--log-file={}", self.log_file(&p.host)),
        ];
        if let Some(limit) = p.bandwidth_limit {
            args.push(format!("--bwlimit={}", limit));
        }
        args.push(Self::source(p));
        args.push(format!("{}/", layout::current_dir(root, p)));

        Command::new(self.settings.rsync_path.as_str(), args)
    }

    /// One command per path, same order.
    pub fn build_all(&self, paths: &[ResolvedPath]) -> Vec<Command> {
        paths.iter().map(|p| self.build(p)).collect()
    }
}
