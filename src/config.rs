//! # Supervisor configuration.
//!
//! [`Config`] centralizes the bounds and defaults of one supervisor instance.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config)` / `Supervisor::builder(config)`
//! 2. **ServiceSpec defaults**: `ServiceSpec::with_defaults(name, service, &config)`
//!
//! ## Sentinel values
//! - `max_services = 0` → unbounded registry
//! - `max_subscriptions = 0` → unbounded subscription table
//! - `callback_timeout = 0s` → callbacks run inline with no bounded wait
//! - `restart_reset_after = 0s` → restart counters are never reset

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Configuration for a [`Supervisor`](crate::Supervisor) and its [`Bus`](crate::Bus).
///
/// ## Field semantics
/// - `max_services`: registry bound (`0` = unbounded)
/// - `max_subscriptions`: subscription table bound (`0` = unbounded)
/// - `queue_capacity`: event queue bound K (min 1)
/// - `callback_timeout`: bounded wait around service callbacks (`0s` = none)
/// - `tick_interval`, `command_capacity`: used by [`Runtime`](crate::Runtime) only
/// - `fail_unhealthy`: a failed health probe moves RUNNING → FAILED
/// - `lifecycle_events`: publish SERVICE_STARTED/STOPPED/CRASHED onto the bus
/// - `restart`, `backoff`, `max_restarts`, `restart_reset_after`: per-service defaults
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of registered services.
    pub max_services: usize,

    /// Maximum number of simultaneously active subscriptions.
    pub max_subscriptions: usize,

    /// Maximum number of queued, undispatched events.
    ///
    /// Publishing into a full queue fails with `QueueFull` and drops the new event.
    pub queue_capacity: usize,

    /// Bounded wait around start/stop/health callbacks.
    ///
    /// When non-zero, each callback runs on a helper thread and the supervisor
    /// waits at most this long. A callback that overruns marks its service FAILED;
    /// the helper thread is left to finish on its own.
    pub callback_timeout: Duration,

    /// Period of the [`Runtime`](crate::Runtime) loop (min 1ms).
    pub tick_interval: Duration,

    /// Depth of the [`Runtime`](crate::Runtime) command channel (min 1).
    pub command_capacity: usize,

    /// Whether a RUNNING service failing its health probe is moved to FAILED
    /// (and thus becomes eligible for auto-restart). When `false` the failure is only logged.
    pub fail_unhealthy: bool,

    /// Whether the supervisor publishes lifecycle events onto its bus.
    pub lifecycle_events: bool,

    /// Default restart policy for [`ServiceSpec::with_defaults`](crate::ServiceSpec::with_defaults).
    pub restart: RestartPolicy,

    /// Default restart backoff for [`ServiceSpec::with_defaults`](crate::ServiceSpec::with_defaults).
    pub backoff: BackoffPolicy,

    /// Default restart budget (`0` = unlimited).
    pub max_restarts: u32,

    /// Default healthy-run window after which the restart counter resets (`0s` = never).
    pub restart_reset_after: Duration,
}

impl Config {
    /// Registry bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn service_limit(&self) -> Option<usize> {
        (self.max_services != 0).then_some(self.max_services)
    }

    /// Subscription bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn subscription_limit(&self) -> Option<usize> {
        (self.max_subscriptions != 0).then_some(self.max_subscriptions)
    }

    /// Queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Callback wait as an `Option` (`None` = call inline).
    #[inline]
    pub fn callback_timeout(&self) -> Option<Duration> {
        (self.callback_timeout != Duration::ZERO).then_some(self.callback_timeout)
    }

    /// Loop period clamped to a minimum of 1ms.
    #[inline]
    pub fn tick_interval_clamped(&self) -> Duration {
        self.tick_interval.max(Duration::from_millis(1))
    }

    /// Command channel depth clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Default reset window as an `Option` (`None` = never reset).
    #[inline]
    pub fn restart_reset_after(&self) -> Option<Duration> {
        (self.restart_reset_after != Duration::ZERO).then_some(self.restart_reset_after)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_services = 64`, `max_subscriptions = 128`, `queue_capacity = 256`
    /// - `callback_timeout = 0s` (inline callbacks)
    /// - `tick_interval = 100ms`, `command_capacity = 64`
    /// - `fail_unhealthy = true`, `lifecycle_events = true`
    /// - `restart = OnFailure`, `backoff = 1s constant`, `max_restarts = 5`
    /// - `restart_reset_after = 0s` (never)
    fn default() -> Self {
        Self {
            max_services: 64,
            max_subscriptions: 128,
            queue_capacity: 256,
            callback_timeout: Duration::ZERO,
            tick_interval: Duration::from_millis(100),
            command_capacity: 64,
            fail_unhealthy: true,
            lifecycle_events: true,
            restart: RestartPolicy::OnFailure,
            backoff: BackoffPolicy::default(),
            max_restarts: 5,
            restart_reset_after: Duration::ZERO,
        }
    }
}
