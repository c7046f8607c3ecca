//! Error types used by the supervisor, the event bus and service callbacks.
//!
//! - [`SupervisorError`] - registry and lifecycle failures (start/stop/register/...).
//! - [`BusError`] - subscription table and event queue failures.
//! - [`ServiceError`] - returned by [`Service`](crate::Service) callbacks.
//! - [`RuntimeError`] - returned by [`SupervisorHandle`](crate::SupervisorHandle) calls and the builder.
//!
//! All of them provide `as_label()` for logs; labels are stable snake_case strings.

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

use crate::events::SubscriptionId;

/// # Errors produced by the service supervisor.
///
/// Every lifecycle operation returns one of these instead of panicking; the
/// caller (bootstrap code, a management endpoint) decides whether a failure is fatal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// No service with this name is registered.
    #[error("service {name:?} not found")]
    NotFound {
        /// Requested service name.
        name: String,
    },

    /// A service with this name is already registered.
    #[error("service {name:?} already registered")]
    Duplicate {
        /// Conflicting service name.
        name: String,
    },

    /// The registry is full.
    #[error("service registry full (limit {limit})")]
    Capacity {
        /// Configured registry bound.
        limit: usize,
    },

    /// A dependency could not be started, so the dependent was not started either.
    #[error("service {service:?}: dependency {dependency:?} failed: {source}")]
    DependencyFailure {
        /// Service whose start was aborted.
        service: String,
        /// First dependency (in listed order) that failed.
        dependency: String,
        /// Why the dependency failed.
        #[source]
        source: Box<SupervisorError>,
    },

    /// The service's own start or stop callback failed.
    #[error("service {service:?}: {source}")]
    CallbackFailure {
        /// Service whose callback failed.
        service: String,
        /// Error reported by the callback.
        #[source]
        source: ServiceError,
    },

    /// The dependency graph reachable from the requested service contains a cycle.
    #[error("dependency cycle: {}", path.join(" -> "))]
    CycleDetected {
        /// Names along the cycle; the first name is repeated at the end.
        path: Vec<String>,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use svcvisor::SupervisorError;
    ///
    /// let err = SupervisorError::NotFound { name: "dhcp".into() };
    /// assert_eq!(err.as_label(), "service_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::NotFound { .. } => "service_not_found",
            SupervisorError::Duplicate { .. } => "service_duplicate",
            SupervisorError::Capacity { .. } => "registry_capacity",
            SupervisorError::DependencyFailure { .. } => "dependency_failure",
            SupervisorError::CallbackFailure { .. } => "callback_failure",
            SupervisorError::CycleDetected { .. } => "dependency_cycle",
        }
    }
}

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The subscription table has no free slot.
    #[error("subscription table full (limit {limit})")]
    Capacity {
        /// Configured subscription bound.
        limit: usize,
    },

    /// The event queue already holds `capacity` events; the new one was dropped.
    #[error("event queue full (capacity {capacity})")]
    QueueFull {
        /// Queue bound K.
        capacity: usize,
    },

    /// No active subscription has this id.
    #[error("subscription {id} not found")]
    NotFound {
        /// Requested subscription id.
        id: SubscriptionId,
    },

    /// Queue-owned storage for the event could not be reserved.
    #[error("failed to reserve {bytes} bytes for event storage")]
    AllocationFailure {
        /// Size of the failed reservation.
        bytes: usize,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Capacity { .. } => "subscription_capacity",
            BusError::QueueFull { .. } => "queue_full",
            BusError::NotFound { .. } => "subscription_not_found",
            BusError::AllocationFailure { .. } => "allocation_failure",
        }
    }
}

/// # Errors produced by service callbacks.
///
/// Service code returns [`ServiceError::Fail`]; the supervisor itself produces
/// `Timeout` and `Panicked` when it has to give up on a callback.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The callback reported a failure.
    #[error("callback failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The callback did not return within the configured bounded wait.
    #[error("callback timed out after {timeout:?}")]
    Timeout {
        /// The wait that was exceeded.
        timeout: Duration,
    },

    /// The callback panicked; the panic was contained.
    #[error("callback panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Fail`].
    ///
    /// # Example
    /// ```
    /// use svcvisor::ServiceError;
    ///
    /// let err = ServiceError::fail("link down");
    /// assert_eq!(err.to_string(), "callback failed: link down");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        ServiceError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "callback_failed",
            ServiceError::Timeout { .. } => "callback_timeout",
            ServiceError::Panicked { .. } => "callback_panicked",
        }
    }
}

/// # Errors produced by [`SupervisorHandle`](crate::SupervisorHandle) calls and
/// [`SupervisorBuilder::build`](crate::SupervisorBuilder::build).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The runtime loop has exited; the command was not applied.
    #[error("supervisor runtime closed")]
    Closed,

    /// The command queue is full; the non-blocking call was not applied.
    #[error("supervisor command queue full")]
    Full,

    /// The supervisor rejected the command.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// The event bus rejected the command.
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Closed => "runtime_closed",
            RuntimeError::Full => "command_queue_full",
            RuntimeError::Supervisor(e) => e.as_label(),
            RuntimeError::Bus(e) => e.as_label(),
        }
    }
}

/// Renders a caught panic payload for logs and [`ServiceError::Panicked`].
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
