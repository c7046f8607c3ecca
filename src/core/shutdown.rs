//! # OS termination signals.
//!
//! [`Signals`] registers the termination signals up front, so a registration
//! failure surfaces before the runtime starts, and then waits for the first one.
//!
//! **Unix:** `SIGINT`, `SIGTERM` (init systems, `kill`), `SIGQUIT`.
//! **Other platforms:** Ctrl-C via [`tokio::signal::ctrl_c`].

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Registered termination signal listeners.
#[cfg(unix)]
pub(crate) struct Signals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
}

#[cfg(unix)]
impl Signals {
    pub(crate) fn register() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next signal and returns its name.
    pub(crate) async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

/// Registered termination signal listeners.
#[cfg(not(unix))]
pub(crate) struct Signals;

#[cfg(not(unix))]
impl Signals {
    pub(crate) fn register() -> io::Result<Self> {
        Ok(Self)
    }

    /// Waits for Ctrl-C. A listener error is logged and never resolves.
    pub(crate) async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c listener failed");
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}
