//! On-disk layout under the backup root.
//!
//! ```text
//! <root>/<host>/<base>/current        live mirror (rsync destination)
//! <root>/<host>/<base>/<YYYY-MM-DD>   files replaced or deleted on that day
//! ```
//!
//! Paths are built by string concatenation on already-normalized values so the
//! rsync arguments and the directories we create or sweep are byte-identical.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;

use crate::resolve::ResolvedPath;

pub const CURRENT_DIR_NAME: &str = "current";

/// `strftime` format of snapshot directory names.
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Last component of a normalized remote path (`/var/www` -> `www`).
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// `<root>/<host>/<base>`: parent of `current` and of all dated snapshots.
pub fn backup_root(root_dir: &str, p: &ResolvedPath) -> String {
    format!("{}/{}/{}", root_dir, p.host, base_name(&p.path))
}

pub fn current_dir(root_dir: &str, p: &ResolvedPath) -> String {
    format!("{}/{}", backup_root(root_dir, p), CURRENT_DIR_NAME)
}

pub fn snapshot_dir(root_dir: &str, p: &ResolvedPath, date: NaiveDate) -> String {
    format!(
        "{}/{}",
        backup_root(root_dir, p),
        date.format(SNAPSHOT_DATE_FORMAT)
    )
}

/// Parse a directory name as a snapshot date. Anything else (e.g. `current`) is `None`.
///
/// Only the exact `YYYY-MM-DD` spelling this tool writes counts; chrono alone
/// would also accept `2024-1-5` or `+2024-01-05`.
pub fn parse_snapshot_name(name: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(name, SNAPSHOT_DATE_FORMAT).ok()?;
    (date.format(SNAPSHOT_DATE_FORMAT).to_string() == name).then_some(date)
}

/// Create `<root>/<host>/<base>/current` for every path where it is missing.
/// Failures are logged and skipped; the rsync job for that path will then fail on its own.
/// Returns the number of directories created.
pub fn ensure_target_dirs(root_dir: &str, paths: &[ResolvedPath]) -> usize {
    let mut created = 0;
    for p in paths {
        let dir = current_dir(root_dir, p);
        if Path::new(&dir).is_dir() {
            continue;
        }
        tracing::info!("create directory {}", dir);
        match fs::create_dir_all(&dir) {
            Ok(()) => created += 1,
            Err(e) => tracing::error!(host = %p.host, "cannot create directory {}: {}", dir, e),
        }
    }
    created
}
