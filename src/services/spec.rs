//! # Service specification for supervised execution.
//!
//! Defines [`ServiceSpec`], the descriptor handed to
//! [`Supervisor::register`](crate::Supervisor::register): a unique name, the
//! service callbacks, an ordered dependency list and the auto-restart policy.
//!
//! A spec can be created:
//! - **Explicitly** with [`ServiceSpec::new`] (auto-restart off)
//! - **From config** with [`ServiceSpec::with_defaults`] (inherit defaults)
//! - **Fluently** with [`ServiceSpec::builder`]
//!
//! ## Rules
//! - A spec is immutable configuration. Runtime counters (state, restart count,
//!   timestamps) live in the supervisor's registry entry.
//! - Auto-restart is on iff `restart` is [`RestartPolicy::OnFailure`].
//! - `max_restarts = 0` means unlimited automatic restarts.

use std::time::Duration;

use crate::config::Config;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::services::service::ServiceRef;

/// Specification for running a service under supervision.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use svcvisor::{Config, RestartPolicy, ServiceFn, ServiceSpec};
///
/// let web = ServiceSpec::new("web", ServiceFn::new().arc())
///     .depends_on("net")
///     .depends_on("dns")
///     .with_restart(RestartPolicy::OnFailure)
///     .with_restart_delay(Duration::from_millis(1000))
///     .with_max_restarts(3);
/// assert_eq!(web.dependencies(), ["net", "dns"]);
/// assert!(web.auto_restart());
///
/// // Inherit restart defaults from global config:
/// let cfg = Config::default();
/// let ntp = ServiceSpec::with_defaults("ntp", ServiceFn::new().arc(), &cfg);
/// assert_eq!(ntp.max_restarts(), cfg.max_restarts);
/// ```
#[derive(Clone)]
pub struct ServiceSpec {
    name: String,
    service: ServiceRef,
    dependencies: Vec<String>,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    max_restarts: u32,
    reset_after: Option<Duration>,
}

impl ServiceSpec {
    /// Creates a specification with no dependencies and auto-restart disabled.
    pub fn new(name: impl Into<String>, service: ServiceRef) -> Self {
        Self {
            name: name.into(),
            service,
            dependencies: Vec::new(),
            restart: RestartPolicy::Never,
            backoff: BackoffPolicy::default(),
            max_restarts: 0,
            reset_after: None,
        }
    }

    /// Creates a specification inheriting restart defaults from global config.
    ///
    /// `cfg.restart_reset_after = 0s` is treated as `None`.
    pub fn with_defaults(name: impl Into<String>, service: ServiceRef, cfg: &Config) -> Self {
        Self {
            name: name.into(),
            service,
            dependencies: Vec::new(),
            restart: cfg.restart,
            backoff: cfg.backoff,
            max_restarts: cfg.max_restarts,
            reset_after: cfg.restart_reset_after(),
        }
    }

    /// Returns the unique service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service callbacks.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Returns dependency names in start order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Convenience: `true` if FAILED services are restarted automatically.
    pub fn auto_restart(&self) -> bool {
        self.restart.restarts_on_failure()
    }

    /// Returns the backoff policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Returns the automatic restart budget (`0` = unlimited).
    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Returns the healthy-run window that resets the restart counter, if any.
    pub fn reset_after(&self) -> Option<Duration> {
        self.reset_after
    }

    /// Returns a new spec with `dependency` appended to the dependency list.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Returns a new spec with the dependency list replaced.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with updated backoff.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a new spec with a constant restart delay.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.backoff = BackoffPolicy::constant(delay);
        self
    }

    /// Returns a new spec with updated restart budget (`0` = unlimited).
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Returns a new spec with updated reset window (`None` = never reset).
    pub fn with_reset_after(mut self, reset_after: Option<Duration>) -> Self {
        self.reset_after = reset_after;
        self
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .field("max_restarts", &self.max_restarts)
            .field("reset_after", &self.reset_after)
            .finish_non_exhaustive()
    }
}
