//! # Cancellation source and OS signal handling.
//!
//! [`CancelSource`] collapses any number of termination requests into a single
//! [`CancellationToken`] that [`Supervisor::run`](crate::Supervisor::run)
//! waits on. Once fired it stays fired.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT`, `SIGTERM`, `SIGQUIT`, `SIGABRT` → cancel
//! - `SIGHUP`, `SIGUSR1`, `SIGUSR2`, `SIGALRM`, `SIGCHLD`, `SIGIO`, `SIGWINCH`
//!   (plus `SIGVTALRM`, `SIGPROF`, `SIGCONT`, `SIGPWR` on Linux) → logged and ignored.
//!   They are caught so their default action (often terminating the process) never
//!   bypasses the drain.
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// One-shot, idempotent shutdown trigger.
#[derive(Clone, Debug, Default)]
pub struct CancelSource {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CancelSource {
    /// Creates an unfired source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to hand to [`Supervisor::run`](crate::Supervisor::run).
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fires the cancellation. Returns true only for the first call, across all clones.
    pub fn cancel(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// True once the source has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns a listener that fires this source on a termination signal.
    ///
    /// Signal handlers are installed before this returns. The listener exits
    /// once the source is cancelled by any means. Must be called from within
    /// a Tokio runtime.
    pub fn listen_os_signals(&self) -> JoinHandle<()> {
        let source = self.clone();
        let signals = Signals::register();
        tokio::spawn(async move {
            let mut signals = match signals {
                Ok(signals) => signals,
                Err(e) => {
                    error!(error = %e, "failed to register signal handlers");
                    return;
                }
            };
            tokio::select! {
                biased;
                _ = source.token.cancelled() => {}
                res = signals.next() => match res {
                    Ok(signal) => {
                        info!(signal, "termination signal received");
                        source.cancel();
                    }
                    Err(e) => error!(error = %e, "signal listener failed"),
                },
            }
        })
    }
}

/// Installed signal streams, each tagged with whether it terminates.
#[cfg(unix)]
struct Signals {
    kinds: Vec<(&'static str, bool, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut table: Vec<(&'static str, bool, SignalKind)> = vec![
            ("SIGINT", true, SignalKind::interrupt()),
            ("SIGTERM", true, SignalKind::terminate()),
            ("SIGQUIT", true, SignalKind::quit()),
            ("SIGABRT", true, SignalKind::from_raw(6)),
            ("SIGHUP", false, SignalKind::hangup()),
            ("SIGUSR1", false, SignalKind::user_defined1()),
            ("SIGUSR2", false, SignalKind::user_defined2()),
            ("SIGALRM", false, SignalKind::alarm()),
            ("SIGCHLD", false, SignalKind::child()),
            ("SIGIO", false, SignalKind::io()),
            ("SIGWINCH", false, SignalKind::window_change()),
        ];
        #[cfg(target_os = "linux")]
        table.extend([
            ("SIGCONT", false, SignalKind::from_raw(18)),
            ("SIGVTALRM", false, SignalKind::from_raw(26)),
            ("SIGPROF", false, SignalKind::from_raw(27)),
            ("SIGPWR", false, SignalKind::from_raw(30)),
        ]);

        let kinds = table
            .into_iter()
            .map(|(name, fatal, kind)| signal(kind).map(|s| (name, fatal, s)))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { kinds })
    }

    /// Waits for the next terminating signal, logging the ones it ignores.
    async fn next(&mut self) -> std::io::Result<&'static str> {
        loop {
            let waits = self.kinds.iter_mut().map(|(name, fatal, sig)| {
                Box::pin(async move {
                    sig.recv().await;
                    (*name, *fatal)
                })
            });
            let ((name, fatal), _, _) = futures::future::select_all(waits).await;
            if fatal {
                return Ok(name);
            }
            debug!(signal = name, "signal ignored");
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> std::io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        Ok("CTRL_C")
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    Signals::register()?.next().await.map(|_| ())
}
