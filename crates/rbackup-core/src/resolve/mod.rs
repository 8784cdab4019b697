//! Resolve the configuration tree into flat per-path policies.
//!
//! Settings are inherited directory -> host -> global: the first scope that
//! sets a value wins. The concurrency limit of a path is its host's limit
//! clamped to the global one. Bandwidth limit (directory) and login user
//! (host) are not inherited.

mod normalize;

pub use normalize::{normalize_path, strip_trailing_slashes};

use std::collections::HashSet;

use crate::config::{
    ConfigError, HostConfig, RawConfig, DEFAULT_CONCURRENT_RSYNC, DEFAULT_RETENTION_DAYS,
    DEFAULT_RSYNC_LOG_PREFIX, DEFAULT_RSYNC_PATH,
};
use crate::layout;

/// Validated global settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Backup root without trailing slash.
    pub root_dir: String,
    /// Global concurrency limit; sizes the worker pool.
    pub concurrency_limit: u32,
    pub retention_days: u32,
    pub rsync_path: String,
    pub rsync_log_prefix: String,
}

/// Effective policy for one (host, directory) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub host: String,
    /// Remote directory, normalized (no trailing slash, never `.`/`..`/empty).
    pub path: String,
    pub retention_days: u32,
    /// Always >= 1 and <= the global limit.
    pub concurrency_limit: u32,
    pub bandwidth_limit: Option<u32>,
    pub login_user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub settings: Settings,
    /// In declaration order; see [`crate::order`] for the execution order.
    pub paths: Vec<ResolvedPath>,
}

impl TryFrom<&RawConfig> for ResolvedConfig {
    type Error = ConfigError;

    fn try_from(raw: &RawConfig) -> Result<Self, Self::Error> {
        resolve(raw)
    }
}

/// Apply defaults to the root scope. Fails if `root_dir` is absent.
pub fn resolve_settings(raw: &RawConfig) -> Result<Settings, ConfigError> {
    let root_dir = match raw.root_dir.as_deref() {
        Some(r) if !r.is_empty() => strip_trailing_slashes(r).to_string(),
        _ => return Err(ConfigError::MissingRootDir),
    };
    let concurrency_limit = raw.concurrent_rsync.unwrap_or(DEFAULT_CONCURRENT_RSYNC);
    if concurrency_limit == 0 {
        return Err(ConfigError::ZeroConcurrency {
            scope: "concurrent_rsync".to_string(),
        });
    }
    Ok(Settings {
        root_dir,
        concurrency_limit,
        retention_days: raw.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
        rsync_path: raw
            .rsync_path
            .clone()
            .unwrap_or_else(|| DEFAULT_RSYNC_PATH.to_string()),
        rsync_log_prefix: raw
            .rsync_log_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_RSYNC_LOG_PREFIX.to_string()),
    })
}

fn host_concurrency(host: &HostConfig, global: u32) -> Result<u32, ConfigError> {
    match host.limit_concurrent_rsync {
        Some(0) => Err(ConfigError::ZeroConcurrency {
            scope: format!("hosts[{}].limit_concurrent_rsync", host.name),
        }),
        Some(limit) => Ok(limit.min(global)),
        None => Ok(global),
    }
}

/// Resolve the whole configuration: global settings plus one [`ResolvedPath`]
/// per valid declared directory.
pub fn resolve(raw: &RawConfig) -> Result<ResolvedConfig, ConfigError> {
    let settings = resolve_settings(raw)?;
    let mut paths = Vec::new();
    let mut destinations = HashSet::new();

    for host in &raw.hosts {
        if host.name.is_empty() {
            tracing::warn!("skipping host entry without name ({} dirs)", host.dirs.len());
            continue;
        }
        let concurrency_limit = host_concurrency(host, settings.concurrency_limit)?;

        for dir in &host.dirs {
            let Some(path) = normalize_path(&dir.path) else {
                if !dir.path.is_empty() {
                    tracing::warn!(host = %host.name, "ignoring invalid backup path {:?}", dir.path);
                }
                continue;
            };
            if !destinations.insert((host.name.clone(), layout::base_name(&path).to_string())) {
                tracing::warn!(
                    host = %host.name,
                    "{} shares its backup directory with another path of the same host",
                    path
                );
            }
            let retention_days = dir
                .retention_days
                .or(host.retention_days)
                .unwrap_or(settings.retention_days);

            paths.push(ResolvedPath {
                host: host.name.clone(),
                path,
                retention_days,
                concurrency_limit,
                bandwidth_limit: dir.bandwidth_limit,
                login_user: host.login_user.clone(),
            });
        }
    }

    Ok(ResolvedConfig { settings, paths })
}
