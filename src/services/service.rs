//! # Service contract.
//!
//! A [`Service`] supplies the three callbacks the supervisor drives: `start`,
//! `stop` and `health`. Each has a default, so a service only implements what it
//! actually needs (a missing callback means "succeeds" / "healthy").
//!
//! Callbacks are **synchronous** and run on the thread that owns the supervisor
//! (or on a helper thread when `Config::callback_timeout` is set). Per-service
//! state lives inside the implementor; the supervisor never inspects it.

use std::sync::Arc;

use crate::error::ServiceError;

/// # Supervised unit of work.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use svcvisor::{Service, ServiceError};
///
/// struct Dhcp {
///     up: AtomicBool,
/// }
///
/// impl Service for Dhcp {
///     fn start(&self) -> Result<(), ServiceError> {
///         self.up.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn stop(&self) -> Result<(), ServiceError> {
///         self.up.store(false, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn health(&self) -> bool {
///         self.up.load(Ordering::SeqCst)
///     }
/// }
///
/// let svc = Dhcp { up: AtomicBool::new(false) };
/// svc.start().unwrap();
/// assert!(svc.health());
/// ```
pub trait Service: Send + Sync + 'static {
    /// Brings the service up. Called on STARTING.
    fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Brings the service down. Called on STOPPING.
    fn stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Liveness probe. Only consulted while the service is RUNNING.
    fn health(&self) -> bool {
        true
    }
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
