//! # Service lifecycle state and read-only snapshots.
//!
//! ```text
//! STOPPED  --start--> STARTING --(cb ok)--> RUNNING --stop--> STOPPING --(cb ok)--> STOPPED
//! STARTING --(cb fail)--> FAILED
//! STOPPING --(cb fail)--> FAILED
//! RUNNING  --(health fail, fail_unhealthy)--> FAILED
//! FAILED   --auto-restart--> RESTARTING --> STARTING
//! FAILED   --stop/restart--> STOPPING ...
//! ```

use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle state of a registered service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Not running (initial state).
    #[default]
    Stopped,
    /// Start callback in progress.
    Starting,
    /// Start callback succeeded.
    Running,
    /// Stop callback in progress.
    Stopping,
    /// A callback, a dependency or a health probe failed.
    Failed,
    /// Picked by the restart policy; about to re-enter STARTING.
    Restarting,
}

impl ServiceState {
    /// Returns a short stable label (lowercase) for logs and management surfaces.
    pub fn as_label(self) -> &'static str {
        match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Failed => "failed",
            ServiceState::Restarting => "restarting",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_label())
    }
}

/// Point-in-time view of one registered service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Lifecycle state.
    pub state: ServiceState,
    /// Automatic restarts performed so far.
    pub restart_count: u32,
    /// Automatic restart budget (`0` = unlimited).
    pub max_restarts: u32,
    /// Whether FAILED is retried automatically.
    pub auto_restart: bool,
    /// When the service last reached RUNNING (cleared on stop or failure).
    pub started_at: Option<Instant>,
    /// When the last automatic restart was attempted.
    pub last_restart: Option<Instant>,
    /// Dependency names in start order.
    pub dependencies: Vec<String>,
}

impl ServiceInfo {
    /// Time spent RUNNING as of `now`, if running.
    pub fn uptime(&self, now: Instant) -> Option<Duration> {
        self.started_at.map(|t| now.saturating_duration_since(t))
    }
}
