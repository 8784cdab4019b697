//! Per-host concurrency gate.
//!
//! Each host gets a semaphore sized by its resolved concurrency limit. A
//! [`HostSlot`] is held for the whole lifetime of one rsync; dropping it frees
//! the slot. Admission never waits: executors ask the gate while scanning the
//! queue and skip jobs whose host is full.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::resolve::ResolvedPath;

#[derive(Debug, Default)]
pub struct HostGate {
    hosts: HashMap<String, Arc<Semaphore>>,
}

/// A running job's claim on its host. Ungated hosts get an empty slot.
#[derive(Debug)]
pub struct HostSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

impl HostGate {
    /// One semaphore per host. All paths of a host share the same limit; if
    /// they ever disagree the smallest wins.
    pub fn from_paths(paths: &[ResolvedPath]) -> Self {
        let mut limits: HashMap<String, usize> = HashMap::new();
        for p in paths {
            let limit = (p.concurrency_limit as usize).max(1);
            limits
                .entry(p.host.clone())
                .and_modify(|l| *l = (*l).min(limit))
                .or_insert(limit);
        }
        Self {
            hosts: limits
                .into_iter()
                .map(|(host, limit)| (host, Arc::new(Semaphore::new(limit))))
                .collect(),
        }
    }

    /// Claim a slot on `host` if one is free. `None` means the host is at its limit.
    pub fn try_enter(&self, host: &str) -> Option<HostSlot> {
        match self.hosts.get(host) {
            Some(sem) => Arc::clone(sem)
                .try_acquire_owned()
                .ok()
                .map(|permit| HostSlot {
                    _permit: Some(permit),
                }),
            None => Some(HostSlot { _permit: None }),
        }
    }

    #[cfg(test)]
    pub(crate) fn available(&self, host: &str) -> Option<usize> {
        self.hosts.get(host).map(|s| s.available_permits())
    }
}
