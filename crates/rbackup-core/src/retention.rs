//! Retention sweep: delete dated snapshots older than a path's retention window.
//!
//! Runs after every transfer job has finished. A snapshot is a directory under
//! `<root>/<host>/<base>/` whose name parses as `YYYY-MM-DD`; anything else is
//! left alone. Deletion is best-effort: a failure is logged and the sweep
//! carries on.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::layout;
use crate::resolve::ResolvedPath;

/// Age in whole days strictly greater than `retention_days`. A snapshot exactly
/// `retention_days` old is kept; future-dated snapshots are always kept.
pub fn is_expired(snapshot: NaiveDate, today: NaiveDate, retention_days: u32) -> bool {
    (today - snapshot).num_days() > i64::from(retention_days)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Deleted snapshots (or, in dry-run mode, the ones that would be deleted).
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper<'a> {
    root_dir: &'a str,
    today: NaiveDate,
    dry_run: bool,
}

impl<'a> RetentionSweeper<'a> {
    pub fn new(root_dir: &'a str, today: NaiveDate) -> Self {
        Self {
            root_dir,
            today,
            dry_run: false,
        }
    }

    /// Only report expired snapshots, do not delete them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn sweep(&self, paths: &[ResolvedPath]) -> SweepReport {
        let mut report = SweepReport::default();
        for p in paths {
            let dir = layout::backup_root(self.root_dir, p);
            let expired = match expired_snapshots(Path::new(&dir), self.today, p.retention_days) {
                Ok(expired) => expired,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(host = %p.host, "cannot list backups in {}: {}", dir, e);
                    continue;
                }
            };
            for snapshot in expired {
                if self.dry_run {
                    tracing::info!("expired backup, would delete directory {}", snapshot.display());
                    report.removed.push(snapshot);
                    continue;
                }
                tracing::info!("expired backup, deleting directory {}", snapshot.display());
                match fs::remove_dir_all(&snapshot) {
                    Ok(()) => report.removed.push(snapshot),
                    Err(e) => {
                        tracing::error!("deleting directory {} failed: {}", snapshot.display(), e);
                        report.failed.push(snapshot);
                    }
                }
            }
        }
        report
    }
}

/// Dated snapshot directories in `dir` that are past `retention_days`, sorted oldest first.
/// Only failing to open `dir` is an error; an unreadable entry is logged and skipped.
pub fn expired_snapshots(
    dir: &Path,
    today: NaiveDate,
    retention_days: u32,
) -> io::Result<Vec<PathBuf>> {
    let mut expired = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("cannot read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let Some(date) = snapshot_date(&path, entry.file_type()) else {
            continue;
        };
        if is_expired(date, today, retention_days) {
            expired.push((date, path));
        }
    }
    expired.sort();
    Ok(expired.into_iter().map(|(_, path)| path).collect())
}

/// The snapshot date of a directory entry, if it is a directory with a date name.
fn snapshot_date(path: &Path, file_type: io::Result<fs::FileType>) -> Option<NaiveDate> {
    match file_type {
        Ok(ft) if ft.is_dir() => {}
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!("cannot stat {}, keeping it: {}", path.display(), e);
            return None;
        }
    }
    path.file_name()?.to_str().and_then(layout::parse_snapshot_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rp(host: &str, path: &str, retention_days: u32) -> ResolvedPath {
        ResolvedPath {
            host: host.to_string(),
            path: path.to_string(),
            retention_days,
            concurrency_limit: 3,
            bandwidth_limit: None,
            login_user: None,
        }
    }

    #[test]
    fn retention_boundary_is_strict() {
        let today = day(2024, 3, 10);
        assert!(!is_expired(day(2024, 3, 3), today, 7));
        assert!(is_expired(day(2024, 3, 2), today, 7));
        assert!(!is_expired(today, today, 0));
        assert!(is_expired(day(2024, 3, 9), today, 0));
        assert!(!is_expired(day(2024, 3, 20), today, 0));
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = tmp.path().join("2020-01-01");
        fs::create_dir(&snap).unwrap();
        let dir_type = fs::metadata(&snap).unwrap().file_type();

        assert_eq!(snapshot_date(&snap, Ok(dir_type)), Some(day(2020, 1, 1)));
        assert_eq!(
            snapshot_date(&snap, Err(io::Error::from(io::ErrorKind::PermissionDenied))),
            None
        );
        assert_eq!(snapshot_date(&tmp.path().join("current"), Ok(dir_type)), None);
    }

    #[test]
    fn loose_date_spellings_are_not_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        let base = tmp.path().join("a/etc");
        for name in ["2020-1-5", "+2020-01-05", "2020-01-05"] {
            fs::create_dir_all(base.join(name)).unwrap();
        }

        let report = RetentionSweeper::new(&root, day(2024, 3, 10)).sweep(&[rp("a", "/etc", 7)]);

        assert_eq!(report.removed, vec![base.join("2020-01-05")]);
        assert!(base.join("2020-1-5").is_dir());
        assert!(base.join("+2020-01-05").is_dir());
    }

    #[test]
    fn sweep_removes_only_expired_dated_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        let base = tmp.path().join("web1/www");
        for name in ["current", "2024-03-03", "2024-03-02", "2024-02-01", "notes", "2024-13-01"] {
            fs::create_dir_all(base.join(name)).unwrap();
        }
        fs::write(base.join("2024-01-01"), b"a file, not a snapshot").unwrap();

        let report = RetentionSweeper::new(&root, day(2024, 3, 10)).sweep(&[rp("web1", "/var/www", 7)]);

        assert_eq!(
            report.removed,
            vec![base.join("2024-02-01"), base.join("2024-03-02")]
        );
        assert!(report.failed.is_empty());
        assert!(base.join("current").is_dir());
        assert!(base.join("2024-03-03").is_dir());
        assert!(base.join("notes").is_dir());
        assert!(base.join("2024-13-01").is_dir());
        assert!(base.join("2024-01-01").is_file());
        assert!(!base.join("2024-03-02").exists());
    }

    #[test]
    fn each_path_uses_its_own_retention() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        fs::create_dir_all(tmp.path().join("a/etc/2024-03-05")).unwrap();
        fs::create_dir_all(tmp.path().join("b/etc/2024-03-05")).unwrap();

        let report = RetentionSweeper::new(&root, day(2024, 3, 10))
            .sweep(&[rp("a", "/etc", 30), rp("b", "/etc", 2)]);
        assert_eq!(report.removed, vec![tmp.path().join("b/etc/2024-03-05")]);
        assert!(tmp.path().join("a/etc/2024-03-05").is_dir());
    }

    #[test]
    fn dry_run_keeps_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        let snap = tmp.path().join("a/etc/2020-01-01");
        fs::create_dir_all(snap.join("nested")).unwrap();

        let report = RetentionSweeper::new(&root, day(2024, 3, 10))
            .dry_run(true)
            .sweep(&[rp("a", "/etc", 7)]);
        assert_eq!(report.removed, vec![snap.clone()]);
        assert!(snap.join("nested").is_dir());
    }

    #[test]
    fn missing_backup_root_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        let report = RetentionSweeper::new(&root, day(2024, 3, 10)).sweep(&[rp("nohost", "/etc", 1)]);
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn deletion_is_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap().to_string();
        let snap = tmp.path().join("a/data/2023-12-31");
        fs::create_dir_all(snap.join("deep/er")).unwrap();
        fs::write(snap.join("deep/er/file.txt"), b"x").unwrap();

        let report = RetentionSweeper::new(&root, day(2024, 3, 10)).sweep(&[rp("a", "/srv/data", 7)]);
        assert_eq!(report.removed.len(), 1);
        assert!(!snap.exists());
    }
}
