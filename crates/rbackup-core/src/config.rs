//! Declarative backup configuration as read from `backup-rsync.toml`.
//!
//! Every optional setting is an `Option` so that "unset" stays distinct from an
//! explicit `0`; the three-level inheritance in [`crate::resolve`] depends on it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// System-wide configuration path used when no user config exists.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/backup-rsync.toml";

pub const DEFAULT_CONCURRENT_RSYNC: u32 = 3;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_RSYNC_PATH: &str = "rsync";
pub const DEFAULT_RSYNC_LOG_PREFIX: &str = "/var/log/backup-rsync";

/// Root of the configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Where backups live. Required; there is no safe default.
    #[serde(default)]
    pub root_dir: Option<String>,
    /// Number of rsync processes run at once across all hosts.
    #[serde(default)]
    pub concurrent_rsync: Option<u32>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    /// Transfer tool executable.
    #[serde(default)]
    pub rsync_path: Option<String>,
    /// Per-host rsync logs go to `<prefix>.<host>.log`.
    #[serde(default)]
    pub rsync_log_prefix: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub name: String,
    #[serde(default)]
    pub limit_concurrent_rsync: Option<u32>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub login_user: Option<String>,
    #[serde(default)]
    pub dirs: Vec<DirConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirConfig {
    pub path: String,
    #[serde(default)]
    pub retention_days: Option<u32>,
    /// rsync `--bwlimit` value.
    #[serde(default)]
    pub bandwidth_limit: Option<u32>,
}

/// Fatal configuration problems. Any of these stops the run before a job is scheduled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot find root_dir key in config root level")]
    MissingRootDir,
    #[error("{scope} must be at least 1")]
    ZeroConcurrency { scope: String },
}

impl RawConfig {
    /// Parse a configuration document. `origin` is only used in error messages.
    pub fn from_toml_str(data: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

/// Config to use when none is given on the command line: the user's
/// `~/.config/rbackup/config.toml` if present, else [`SYSTEM_CONFIG_PATH`].
pub fn default_config_path() -> PathBuf {
    xdg::BaseDirectories::with_prefix("rbackup")
        .ok()
        .and_then(|dirs| dirs.find_config_file("config.toml"))
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG_PATH))
}

/// Read and parse the configuration file at `path`.
pub fn load_from_path(path: &Path) -> Result<RawConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = RawConfig::from_toml_str(&data, path)?;
    tracing::debug!(path = %path.display(), hosts = cfg.hosts.len(), "loaded config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> RawConfig {
        RawConfig::from_toml_str(data, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn full_document_parses() {
        let cfg = parse(
            r#"
            root_dir = "/srv/backup/"
            concurrent_rsync = 4
            retention_days = 14

            [[hosts]]
            name = "db1"
            limit_concurrent_rsync = 2
            login_user = "backup"

            [[hosts.dirs]]
            path = "/var/lib/postgresql"
            retention_days = 30
            bandwidth_limit = 5000

            [[hosts.dirs]]
            path = "/etc"

            [[hosts]]
            name = "web1"

            [[hosts.dirs]]
            path = "/var/www/"
        "#,
        );
        assert_eq!(cfg.root_dir.as_deref(), Some("/srv/backup/"));
        assert_eq!(cfg.concurrent_rsync, Some(4));
        assert_eq!(cfg.retention_days, Some(14));
        assert_eq!(cfg.hosts.len(), 2);
        let db1 = &cfg.hosts[0];
        assert_eq!(db1.limit_concurrent_rsync, Some(2));
        assert_eq!(db1.login_user.as_deref(), Some("backup"));
        assert_eq!(db1.dirs.len(), 2);
        assert_eq!(db1.dirs[0].retention_days, Some(30));
        assert_eq!(db1.dirs[0].bandwidth_limit, Some(5000));
        assert_eq!(db1.dirs[1].retention_days, None);
        assert!(cfg.hosts[1].login_user.is_none());
    }

    #[test]
    fn unset_and_zero_are_distinct() {
        let cfg = parse(
            r#"
            root_dir = "/b"
            retention_days = 0
        "#,
        );
        assert_eq!(cfg.retention_days, Some(0));
        assert_eq!(cfg.concurrent_rsync, None);
    }

    #[test]
    fn missing_root_dir_still_parses() {
        let cfg = parse("concurrent_rsync = 2\n");
        assert!(cfg.root_dir.is_none());
    }

    #[test]
    fn negative_values_are_rejected() {
        let err = RawConfig::from_toml_str("root_dir = \"/b\"\nretention_days = -1\n", Path::new("x"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RawConfig::from_toml_str("root_dir = \"/b\"\nretension_days = 3\n", Path::new("x"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.toml");
        fs::write(&path, "root_dir = \"/b\"\nrsync_path = \"/usr/local/bin/rsync\"\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.root_dir.as_deref(), Some("/b"));
        assert_eq!(cfg.rsync_path.as_deref(), Some("/usr/local/bin/rsync"));
    }
}
