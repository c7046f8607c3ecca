//! # Supervisor builder.
//!
//! Collects subscribers and services and registers them in order when
//! [`SupervisorBuilder::build`] runs, so a composition root can describe the
//! whole control plane in one expression.

use crate::config::Config;
use crate::core::supervisor::Supervisor;
use crate::error::RuntimeError;
use crate::events::EventFilter;
use crate::services::ServiceSpec;
use crate::subscribers::Subscribe;

/// Builder for constructing a [`Supervisor`] with subscribers and services.
///
/// ## Example
/// ```rust
/// use svcvisor::{Config, EventFilter, LogWriter, ServiceFn, ServiceSpec, Supervisor};
///
/// let sup = Supervisor::builder(Config::default())
///     .with_subscriber(EventFilter::All, Box::new(LogWriter::new()))
///     .with_service(ServiceSpec::new("net", ServiceFn::new().arc()))
///     .with_service(ServiceSpec::new("dhcp", ServiceFn::new().arc()).depends_on("net"))
///     .build()
///     .unwrap();
///
/// assert_eq!(sup.list(), ["net", "dhcp"]);
/// assert_eq!(sup.bus().subscription_count(), 1);
/// ```
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<(EventFilter, Box<dyn Subscribe>)>,
    services: Vec<ServiceSpec>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Adds a bus subscriber receiving events that pass `filter`.
    pub fn with_subscriber(
        mut self,
        filter: impl Into<EventFilter>,
        subscriber: Box<dyn Subscribe>,
    ) -> Self {
        self.subscribers.push((filter.into(), subscriber));
        self
    }

    /// Adds a service; services are registered in the order they were added.
    pub fn with_service(mut self, spec: ServiceSpec) -> Self {
        self.services.push(spec);
        self
    }

    /// Adds several services.
    pub fn with_services(mut self, specs: impl IntoIterator<Item = ServiceSpec>) -> Self {
        self.services.extend(specs);
        self
    }

    /// Builds the supervisor: subscribers first (so they observe every
    /// lifecycle event), then services. Nothing is started.
    pub fn build(self) -> Result<Supervisor, RuntimeError> {
        let mut sup = Supervisor::new(self.cfg);
        for (filter, subscriber) in self.subscribers {
            sup.bus_mut().subscribe(filter, subscriber)?;
        }
        for spec in self.services {
            sup.register(spec)?;
        }
        Ok(sup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BusError, SupervisorError};
    use crate::services::ServiceFn;
    use crate::subscribers::LogWriter;

    #[test]
    fn duplicate_service_fails_build() {
        let res = SupervisorBuilder::new(Config::default())
            .with_service(ServiceSpec::new("a", ServiceFn::new().arc()))
            .with_service(ServiceSpec::new("a", ServiceFn::new().arc()))
            .build();
        assert!(matches!(
            res,
            Err(RuntimeError::Supervisor(SupervisorError::Duplicate { .. }))
        ));
    }

    #[test]
    fn subscription_bound_fails_build() {
        let cfg = Config {
            max_subscriptions: 1,
            ..Config::default()
        };
        let res = SupervisorBuilder::new(cfg)
            .with_subscriber(EventFilter::All, Box::new(LogWriter::new()))
            .with_subscriber(EventFilter::All, Box::new(LogWriter::new()))
            .build();
        assert!(matches!(
            res,
            Err(RuntimeError::Bus(BusError::Capacity { limit: 1 }))
        ));
    }
}
