use std::time::Duration;

use crate::{BackoffPolicy, RestartPolicy, ServiceFn, ServiceRef, ServiceSpec};

/// Builder for [`ServiceSpec`] with fluent API.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use svcvisor::{ServiceFn, ServiceSpec};
///
/// let spec = ServiceSpec::builder("net")
///     .auto_restart(Duration::from_millis(1000), 3)
///     .build_fn(ServiceFn::new().on_start(|| Ok(())));
/// assert!(spec.auto_restart());
/// assert_eq!(spec.max_restarts(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct ServiceSpecBuilder {
    name: String,
    dependencies: Vec<String>,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    max_restarts: u32,
    reset_after: Option<Duration>,
}

impl ServiceSpecBuilder {
    /// Creates a new builder with the given service name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            max_restarts: 0,
            reset_after: None,
        }
    }

    /// Appends a dependency.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_reset_after(mut self, reset_after: Duration) -> Self {
        self.reset_after = Some(reset_after);
        self
    }

    /// Enables auto-restart with a constant `delay` and at most `max_restarts` attempts.
    pub fn auto_restart(mut self, delay: Duration, max_restarts: u32) -> Self {
        self.restart = RestartPolicy::OnFailure;
        self.backoff = BackoffPolicy::constant(delay);
        self.max_restarts = max_restarts;
        self
    }

    /// Build ServiceSpec from an existing ServiceRef
    pub fn build(self, service: ServiceRef) -> ServiceSpec {
        ServiceSpec::new(self.name, service)
            .with_dependencies(self.dependencies)
            .with_restart(self.restart)
            .with_backoff(self.backoff)
            .with_max_restarts(self.max_restarts)
            .with_reset_after(self.reset_after)
    }

    /// Build ServiceSpec from closures
    pub fn build_fn(self, service: ServiceFn) -> ServiceSpec {
        self.build(service.arc())
    }
}

impl ServiceSpec {
    /// Creates a builder for constructing ServiceSpec with fluent API
    pub fn builder(name: impl Into<String>) -> ServiceSpecBuilder {
        ServiceSpecBuilder::new(name)
    }
}
