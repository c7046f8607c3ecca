//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] assembles a [`Service`] from up to three closures. Unset
//! callbacks fall back to the trait defaults. State shared between the closures
//! is captured explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use svcvisor::{ServiceError, ServiceFn, ServiceRef};
//!
//! let starts = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&starts);
//!
//! let svc: ServiceRef = ServiceFn::new()
//!     .on_start(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .on_stop(|| Err(ServiceError::fail("busy")))
//!     .arc();
//!
//! svc.start().unwrap();
//! assert_eq!(starts.load(Ordering::SeqCst), 1);
//! assert!(svc.stop().is_err());
//! assert!(svc.health());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::services::service::{Service, ServiceRef};

type Hook = Box<dyn Fn() -> Result<(), ServiceError> + Send + Sync>;
type Probe = Box<dyn Fn() -> bool + Send + Sync>;

/// Service assembled from closures.
#[derive(Default)]
pub struct ServiceFn {
    start: Option<Hook>,
    stop: Option<Hook>,
    health: Option<Probe>,
}

impl ServiceFn {
    /// Creates a service whose callbacks all use the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start callback.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.start = Some(Box::new(f));
        self
    }

    /// Sets the stop callback.
    pub fn on_stop<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.stop = Some(Box::new(f));
        self
    }

    /// Sets the health probe.
    pub fn on_health<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.health = Some(Box::new(f));
        self
    }

    /// Returns the service as a shared handle.
    pub fn arc(self) -> ServiceRef {
        Arc::new(self)
    }
}

impl Service for ServiceFn {
    fn start(&self) -> Result<(), ServiceError> {
        self.start.as_ref().map_or(Ok(()), |f| f())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.stop.as_ref().map_or(Ok(()), |f| f())
    }

    fn health(&self) -> bool {
        self.health.as_ref().is_none_or(|f| f())
    }
}

impl fmt::Debug for ServiceFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFn")
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .field("health", &self.health.is_some())
            .finish()
    }
}
