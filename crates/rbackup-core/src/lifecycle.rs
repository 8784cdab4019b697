//! Run lifecycle: hold the singleton lock for the whole run and abort on
//! SIGINT/SIGTERM.
//!
//! The work gets a [`Shutdown`] handle and races the termination signals. On a
//! signal the handle fires, the worker pool kills its in-flight rsyncs and
//! unwinds, and only then is the lock released. The caller exits with
//! [`TermSignal::exit_code`].

use anyhow::{Context, Result};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;

use crate::lock::RunLock;

/// How long interrupted work may take to kill its children and return.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    Interrupt,
    Terminate,
}

impl TermSignal {
    /// Conventional `128 + signo`.
    pub fn exit_code(self) -> i32 {
        match self {
            TermSignal::Interrupt => 130,
            TermSignal::Terminate => 143,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome<T> {
    Completed(T),
    Interrupted(TermSignal),
}

/// Cancellation handle handed to the work of a run. Cheap to clone; every
/// clone observes the same request.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A handle that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub(crate) fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested; pends forever if it never will be.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Listens for SIGINT and SIGTERM once installed.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("install SIGTERM handler")?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) -> TermSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TermSignal::Interrupt,
            _ = self.terminate.recv() => TermSignal::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> TermSignal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => TermSignal::Interrupt,
            Err(e) => {
                tracing::warn!("ctrl-c handler: {}", e);
                std::future::pending().await
            }
        }
    }
}

/// Run `work` while holding the lock at `lock_path`. Fails immediately if the
/// lock is held elsewhere; `work` is not even started in that case.
pub async fn run_exclusive<W, F, T>(lock_path: &Path, work: W) -> Result<RunOutcome<T>>
where
    W: FnOnce(Shutdown) -> F,
    F: Future<Output = Result<T>>,
{
    let lock = RunLock::try_acquire(lock_path)?;
    tracing::info!(path = %lock.path().display(), "holding run lock");
    let mut signals = TerminationSignals::install()?;

    let (stop, shutdown) = Shutdown::channel();
    let work = work(shutdown);
    tokio::pin!(work);

    let sig = tokio::select! {
        res = &mut work => return Ok(RunOutcome::Completed(res?)),
        sig = signals.recv() => sig,
    };

    tracing::error!("program killed by {:?}", sig);
    let _ = stop.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut work).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!("interrupted run ended with error: {:#}", e),
        Err(_) => tracing::warn!("interrupted run did not stop within {:?}", SHUTDOWN_GRACE),
    }
    drop(lock);
    Ok(RunOutcome::Interrupted(sig))
}
