//! Process-wide singleton lock for a backup run.
//!
//! The lock is an exclusive, non-blocking `flock(2)` on a well-known file; the
//! holder writes its pid into it for diagnostics. The lock is released when
//! [`RunLock`] is dropped, and by the kernel if the process dies.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const LOCK_FILE_NAME: &str = "backup-rsync.lock";

/// `<tmp>/backup-rsync.lock`, shared by every invocation on the machine.
pub fn default_lock_path() -> PathBuf {
    std::env::temp_dir().join(LOCK_FILE_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("cannot lock {}: another run is in progress{}", path.display(), holder_suffix(*holder))]
    Held { path: PathBuf, holder: Option<u32> },
    #[error("cannot lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn holder_suffix(holder: Option<u32>) -> String {
    holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default()
}

#[cfg(unix)]
type LockedFile = nix::fcntl::Flock<File>;
#[cfg(not(unix))]
type LockedFile = File;

/// Held run lock. Dropping it releases the lock.
pub struct RunLock {
    file: LockedFile,
    path: PathBuf,
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RunLock {
    /// Take the lock or fail immediately if another process (or another
    /// `RunLock` in this process) holds it. Never blocks.
    pub fn try_acquire(path: &Path) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        let mut file = lock_exclusive(file, path)?;
        file.set_len(0).map_err(io_err)?;
        write!(&mut *file, "{}", std::process::id()).map_err(io_err)?;
        tracing::debug!(path = %path.display(), "run lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // The flock itself goes with `file`.
        if let Err(e) = self.file.set_len(0) {
            tracing::warn!(path = %self.path.display(), "clear run lock: {}", e);
        }
        tracing::debug!(path = %self.path.display(), "run lock released");
    }
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn lock_exclusive(file: File, path: &Path) -> Result<LockedFile, LockError> {
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => Ok(lock),
        Err((_file, Errno::EWOULDBLOCK)) => Err(LockError::Held {
            path: path.to_path_buf(),
            holder: read_holder(path),
        }),
        Err((_file, errno)) => Err(LockError::Io {
            path: path.to_path_buf(),
            source: io::Error::from(errno),
        }),
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: File, path: &Path) -> Result<LockedFile, LockError> {
    Err(LockError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::Unsupported, "run lock requires flock(2)"),
    })
}
