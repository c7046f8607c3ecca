//! # Supervisor: service registry, lifecycle state machine and event bus.
//!
//! The [`Supervisor`] is the context object a firmware composition root builds
//! once and drives from its periodic loop. It owns:
//! - the service registry (bounded, registration-ordered),
//! - the [`Bus`] that carries lifecycle and domain events,
//! - the [`Config`] bounds and defaults.
//!
//! ## Key responsibilities
//! - register/unregister services and answer queries (`get_state`, `is_healthy`, `list`)
//! - start services dependencies-first, refusing dependency cycles up front
//! - stop/restart services and run bulk operations in registration order
//! - publish SERVICE_STARTED / SERVICE_STOPPED / SERVICE_CRASHED onto the bus
//! - drive health checks and auto-restart from [`tick`](Supervisor::tick)
//!
//! ## High-level architecture
//! ```text
//! composition root / management surface
//!     │ register / start / stop / restart / start_all / stop_all / queries
//!     ▼
//! Supervisor ───────────────────────────────────────────────────────────┐
//!   start(name)                                                         │
//!     ├─► resolver::find_cycle(name)        → CycleDetected (no change) │
//!     └─► start_walk(name)                                              │
//!           ├─► start_walk(dep) for each dep, in listed order           │
//!           │      └─ Err → FAILED, DependencyFailure                   │
//!           ├─► STARTING → invoke::start(service)                       │
//!           │      ├─ Ok  → RUNNING, started_at = now ─► SERVICE_STARTED│
//!           │      └─ Err → FAILED, CallbackFailure   ─► SERVICE_CRASHED│
//!                                                                       │
//! periodic loop:  cycle(now) = tick(now) ─► bus.process()  ◄────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use svcvisor::{Config, ServiceFn, ServiceSpec, ServiceState, Supervisor};
//!
//! let mut sup = Supervisor::new(Config::default());
//! sup.register(ServiceSpec::new("c", ServiceFn::new().arc())).unwrap();
//! sup.register(ServiceSpec::new("b", ServiceFn::new().arc()).depends_on("c")).unwrap();
//! sup.register(ServiceSpec::new("a", ServiceFn::new().arc()).depends_on("b")).unwrap();
//!
//! sup.start("a").unwrap();
//! for name in ["a", "b", "c"] {
//!     assert_eq!(sup.get_state(name).unwrap(), ServiceState::Running);
//! }
//!
//! assert_eq!(sup.stop_all(), 3);
//! assert_eq!(sup.get_state("a").unwrap(), ServiceState::Stopped);
//! ```

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::builder::SupervisorBuilder;
use crate::core::health::TickReport;
use crate::core::registry::Registry;
use crate::core::state::{ServiceInfo, ServiceState};
use crate::core::{invoke, resolver};
use crate::error::SupervisorError;
use crate::events::{Bus, EventKind, Priority};
use crate::services::ServiceSpec;

/// Source tag of the lifecycle events published by the supervisor.
pub const LIFECYCLE_SOURCE: &str = "supervisor";

/// Owns the service registry and the event bus; single control-thread owner.
pub struct Supervisor {
    pub(super) cfg: Config,
    pub(super) registry: Registry,
    pub(super) bus: Bus,
}

impl Supervisor {
    /// Creates an empty supervisor with a bus sized by `cfg`.
    pub fn new(cfg: Config) -> Self {
        Self {
            registry: Registry::new(cfg.service_limit()),
            bus: Bus::from_config(&cfg),
            cfg,
        }
    }

    /// Creates a builder for registering subscribers and services up front.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Read access to the event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Write access to the event bus (subscribe, publish, process).
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Registers a service in STOPPED state.
    ///
    /// Fails with `Duplicate` if the name is taken and `Capacity` if the registry is full.
    pub fn register(&mut self, spec: ServiceSpec) -> Result<(), SupervisorError> {
        let name = spec.name().to_string();
        let deps = spec.dependencies().to_vec();
        match self.registry.insert(spec) {
            Ok(()) => {
                info!(service = %name, ?deps, "service registered");
                Ok(())
            }
            Err(e) => {
                warn!(service = %name, error = %e, "service registration rejected");
                Err(e)
            }
        }
    }

    /// Removes a service, stopping it first if it is RUNNING.
    ///
    /// A failing stop callback is logged; the service is removed regardless.
    pub fn unregister(&mut self, name: &str) -> Result<(), SupervisorError> {
        let state = self.state_of(name)?;
        if state == ServiceState::Running {
            if let Err(e) = self.stop(name) {
                warn!(service = %name, error = %e, "stop before unregister failed");
            }
        }
        self.registry.remove(name);
        info!(service = %name, "service unregistered");
        Ok(())
    }

    /// Starts `name` after its dependencies, depth-first in listed order.
    ///
    /// - `NotFound` if unknown; no-op if already RUNNING or STARTING.
    /// - `CycleDetected` if a dependency cycle is reachable; nothing is started.
    /// - `DependencyFailure` if a dependency cannot be started; remaining siblings
    ///   are not attempted, already started ones keep running, and `name` becomes FAILED.
    /// - `CallbackFailure` if the start callback fails; `name` becomes FAILED.
    pub fn start(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.start_at(name, Instant::now())
    }

    /// [`start`](Supervisor::start) with `started_at` stamped as `now`.
    ///
    /// Use this when the loop drives [`tick`](Supervisor::tick) from its own
    /// clock, so `reset_after` and uptimes are measured on that clock.
    pub fn start_at(&mut self, name: &str, now: Instant) -> Result<(), SupervisorError> {
        self.state_of(name)?;
        if let Some(path) = resolver::find_cycle(&self.registry, name) {
            error!(service = %name, cycle = %path.join(" -> "), "refusing to start: dependency cycle");
            return Err(SupervisorError::CycleDetected { path });
        }
        self.start_walk(name, now)
    }

    fn start_walk(&mut self, name: &str, now: Instant) -> Result<(), SupervisorError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| SupervisorError::NotFound {
                name: name.to_string(),
            })?;
        if matches!(entry.state, ServiceState::Running | ServiceState::Starting) {
            return Ok(());
        }

        let deps = entry.spec.dependencies().to_vec();
        for dep in deps {
            if let Err(e) = self.start_walk(&dep, now) {
                error!(service = %name, dependency = %dep, error = %e, "dependency failed to start");
                self.mark_failed(name, None);
                return Err(SupervisorError::DependencyFailure {
                    service: name.to_string(),
                    dependency: dep,
                    source: Box::new(e),
                });
            }
        }

        let service = match self.registry.get_mut(name) {
            Some(entry) => {
                entry.state = ServiceState::Starting;
                entry.spec.service().clone()
            }
            None => {
                return Err(SupervisorError::NotFound {
                    name: name.to_string(),
                });
            }
        };
        debug!(service = %name, "starting");

        match invoke::start(&service, self.cfg.callback_timeout()) {
            Ok(()) => {
                if let Some(entry) = self.registry.get_mut(name) {
                    entry.state = ServiceState::Running;
                    entry.started_at = Some(now);
                    entry.failed_seen = None;
                    entry.retry_delay = None;
                }
                info!(service = %name, "service running");
                self.announce(EventKind::ServiceStarted, Priority::Normal, name);
                Ok(())
            }
            Err(e) => {
                error!(service = %name, error = %e, label = e.as_label(), "start callback failed");
                self.mark_failed(name, None);
                Err(SupervisorError::CallbackFailure {
                    service: name.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Stops `name`. No-op if already STOPPED or STOPPING.
    ///
    /// A failing stop callback leaves the service FAILED and returns `CallbackFailure`.
    pub fn stop(&mut self, name: &str) -> Result<(), SupervisorError> {
        let service = {
            let entry = self
                .registry
                .get_mut(name)
                .ok_or_else(|| SupervisorError::NotFound {
                    name: name.to_string(),
                })?;
            if matches!(entry.state, ServiceState::Stopped | ServiceState::Stopping) {
                return Ok(());
            }
            entry.state = ServiceState::Stopping;
            entry.spec.service().clone()
        };
        debug!(service = %name, "stopping");

        match invoke::stop(&service, self.cfg.callback_timeout()) {
            Ok(()) => {
                if let Some(entry) = self.registry.get_mut(name) {
                    entry.state = ServiceState::Stopped;
                    entry.started_at = None;
                    entry.failed_seen = None;
                    entry.retry_delay = None;
                }
                info!(service = %name, "service stopped");
                self.announce(EventKind::ServiceStopped, Priority::Normal, name);
                Ok(())
            }
            Err(e) => {
                error!(service = %name, error = %e, label = e.as_label(), "stop callback failed");
                self.mark_failed(name, None);
                Err(SupervisorError::CallbackFailure {
                    service: name.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Stops then starts `name`. Not atomic: a failed start after a successful
    /// stop leaves the service FAILED. Does not touch the restart counter.
    pub fn restart(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.restart_at(name, Instant::now())
    }

    /// [`restart`](Supervisor::restart) on the caller's clock; see [`start_at`](Supervisor::start_at).
    pub fn restart_at(&mut self, name: &str, now: Instant) -> Result<(), SupervisorError> {
        info!(service = %name, "manual restart");
        self.stop(name)?;
        self.start_at(name, now)
    }

    /// Starts every service in registration order. Returns how many succeeded.
    pub fn start_all(&mut self) -> usize {
        self.start_all_at(Instant::now())
    }

    /// [`start_all`](Supervisor::start_all) on the caller's clock.
    pub fn start_all_at(&mut self, now: Instant) -> usize {
        let names = self.registry.names();
        let total = names.len();
        let started = names
            .iter()
            .filter(|name| self.start_at(name, now).is_ok())
            .count();
        info!(started, total, "start_all finished");
        started
    }

    /// Stops every service in registration order. Returns how many succeeded.
    pub fn stop_all(&mut self) -> usize {
        let names = self.registry.names();
        let total = names.len();
        let stopped = names
            .iter()
            .filter(|name| self.stop(name).is_ok())
            .count();
        info!(stopped, total, "stop_all finished");
        stopped
    }

    /// Current lifecycle state of `name`.
    pub fn get_state(&self, name: &str) -> Result<ServiceState, SupervisorError> {
        self.state_of(name)
    }

    /// `true` iff `name` is RUNNING and its health probe passes.
    pub fn is_healthy(&self, name: &str) -> bool {
        let Some(entry) = self.registry.get(name) else {
            return false;
        };
        if entry.state != ServiceState::Running {
            return false;
        }
        match invoke::health(entry.spec.service(), self.cfg.callback_timeout()) {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(service = %name, error = %e, "health probe failed");
                false
            }
        }
    }

    /// Service names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Snapshots of every service in registration order.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.registry.iter().map(|e| e.info()).collect()
    }

    /// Snapshot of one service.
    pub fn info(&self, name: &str) -> Option<ServiceInfo> {
        self.registry.get(name).map(|e| e.info())
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if no services are registered.
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// One iteration of the owning loop: [`tick`](Supervisor::tick) then drain the bus.
    ///
    /// Returns the tick report and the number of events dispatched.
    pub fn cycle(&mut self, now: Instant) -> (TickReport, usize) {
        let report = self.tick(now);
        let dispatched = self.bus.process();
        (report, dispatched)
    }

    /// Stops every service, delivers the resulting events and clears the registry.
    ///
    /// Returns how many services stopped cleanly. Subscriptions are left in place.
    pub fn shutdown(&mut self) -> usize {
        let stopped = self.stop_all();
        let dispatched = self.bus.process();
        let total = self.registry.len();
        self.registry.clear();
        info!(stopped, total, dispatched, "supervisor shut down");
        stopped
    }

    fn state_of(&self, name: &str) -> Result<ServiceState, SupervisorError> {
        self.registry
            .get(name)
            .map(|e| e.state)
            .ok_or_else(|| SupervisorError::NotFound {
                name: name.to_string(),
            })
    }

    /// Moves `name` to FAILED and clears its run bookkeeping.
    ///
    /// `seen` opens the first restart delay window; `None` leaves it to the next tick.
    pub(super) fn mark_failed(&mut self, name: &str, seen: Option<Instant>) {
        let Some(entry) = self.registry.get_mut(name) else {
            return;
        };
        let was_failed = entry.state == ServiceState::Failed;
        entry.state = ServiceState::Failed;
        entry.started_at = None;
        entry.failed_seen = seen;
        entry.retry_delay = None;
        if !was_failed {
            self.announce(EventKind::ServiceCrashed, Priority::High, name);
        }
    }

    fn announce(&mut self, kind: EventKind, priority: Priority, name: &str) {
        if !self.cfg.lifecycle_events {
            return;
        }
        if let Err(e) =
            self.bus
                .publish_simple(kind, priority, Some(name.as_bytes()), LIFECYCLE_SOURCE)
        {
            debug!(service = %name, %kind, error = %e, "lifecycle event dropped");
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("services", &self.registry.names())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::events::{Event, EventFilter};
    use crate::services::ServiceFn;
    use crate::subscribers::SubscriberFn;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Service that records `start:<name>` / `stop:<name>` into a shared journal.
    fn journaled(name: &'static str, journal: &Journal) -> ServiceFn {
        let on_start = Arc::clone(journal);
        let on_stop = Arc::clone(journal);
        ServiceFn::new()
            .on_start(move || {
                on_start.lock().unwrap().push(format!("start:{name}"));
                Ok(())
            })
            .on_stop(move || {
                on_stop.lock().unwrap().push(format!("stop:{name}"));
                Ok(())
            })
    }

    fn failing() -> ServiceFn {
        ServiceFn::new().on_start(|| Err(ServiceError::fail("refused")))
    }

    fn lifecycle_log(sup: &mut Supervisor) -> Arc<Mutex<Vec<(EventKind, String)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        sup.bus_mut()
            .subscribe(
                EventFilter::All,
                SubscriberFn::boxed("lifecycle", move |ev: &Event| {
                    let name = ev.payload_str().unwrap_or_default().to_string();
                    sink.lock().unwrap().push((ev.kind, name));
                }),
            )
            .unwrap();
        log
    }

    #[test]
    fn start_without_dependencies() {
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("ok", ServiceFn::new().arc()))
            .unwrap();
        sup.register(ServiceSpec::new("bad", failing().arc()))
            .unwrap();

        sup.start("ok").unwrap();
        assert_eq!(sup.get_state("ok").unwrap(), ServiceState::Running);
        assert!(sup.info("ok").unwrap().started_at.is_some());

        let err = sup.start("bad").unwrap_err();
        assert!(matches!(err, SupervisorError::CallbackFailure { ref service, .. } if service == "bad"));
        assert_eq!(sup.get_state("bad").unwrap(), ServiceState::Failed);
        assert!(sup.info("bad").unwrap().started_at.is_none());
    }

    #[test]
    fn dependencies_start_first_in_order() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("a", journaled("a", &journal).arc()).depends_on("b"))
            .unwrap();
        sup.register(ServiceSpec::new("b", journaled("b", &journal).arc()).depends_on("c"))
            .unwrap();
        sup.register(ServiceSpec::new("c", journaled("c", &journal).arc()))
            .unwrap();

        sup.start("a").unwrap();
        assert_eq!(*journal.lock().unwrap(), ["start:c", "start:b", "start:a"]);
        for name in ["a", "b", "c"] {
            assert_eq!(sup.get_state(name).unwrap(), ServiceState::Running);
        }

        // Already running: no callbacks.
        sup.start("a").unwrap();
        assert_eq!(journal.lock().unwrap().len(), 3);
    }

    #[test]
    fn shared_dependency_starts_once() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("base", journaled("base", &journal).arc()))
            .unwrap();
        sup.register(ServiceSpec::new("left", journaled("left", &journal).arc()).depends_on("base"))
            .unwrap();
        sup.register(
            ServiceSpec::new("right", journaled("right", &journal).arc()).depends_on("base"),
        )
        .unwrap();
        sup.register(
            ServiceSpec::new("app", journaled("app", &journal).arc())
                .with_dependencies(["left", "right"]),
        )
        .unwrap();

        sup.start("app").unwrap();
        assert_eq!(
            *journal.lock().unwrap(),
            ["start:base", "start:left", "start:right", "start:app"]
        );
    }

    #[test]
    fn dependency_failure_aborts_without_rollback() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("ok", journaled("ok", &journal).arc()))
            .unwrap();
        sup.register(ServiceSpec::new("broken", failing().arc()))
            .unwrap();
        sup.register(ServiceSpec::new("later", journaled("later", &journal).arc()))
            .unwrap();
        sup.register(
            ServiceSpec::new("app", journaled("app", &journal).arc())
                .with_dependencies(["ok", "broken", "later"]),
        )
        .unwrap();

        let err = sup.start("app").unwrap_err();
        match err {
            SupervisorError::DependencyFailure {
                service,
                dependency,
                source,
            } => {
                assert_eq!(service, "app");
                assert_eq!(dependency, "broken");
                assert!(matches!(*source, SupervisorError::CallbackFailure { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(sup.get_state("ok").unwrap(), ServiceState::Running);
        assert_eq!(sup.get_state("broken").unwrap(), ServiceState::Failed);
        assert_eq!(sup.get_state("later").unwrap(), ServiceState::Stopped);
        assert_eq!(sup.get_state("app").unwrap(), ServiceState::Failed);
        assert_eq!(*journal.lock().unwrap(), ["start:ok"]);
    }

    #[test]
    fn unknown_dependency_is_a_dependency_failure() {
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("web", ServiceFn::new().arc()).depends_on("ghost"))
            .unwrap();

        let err = sup.start("web").unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::DependencyFailure { ref dependency, ref source, .. }
                if dependency == "ghost" && matches!(**source, SupervisorError::NotFound { .. })
        ));
        assert_eq!(sup.get_state("web").unwrap(), ServiceState::Failed);
    }

    #[test]
    fn cycle_is_rejected_before_any_start() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("a", journaled("a", &journal).arc()).depends_on("b"))
            .unwrap();
        sup.register(ServiceSpec::new("b", journaled("b", &journal).arc()).depends_on("a"))
            .unwrap();

        let err = sup.start("a").unwrap_err();
        match err {
            SupervisorError::CycleDetected { path } => assert_eq!(path, ["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(journal.lock().unwrap().is_empty());
        assert_eq!(sup.get_state("a").unwrap(), ServiceState::Stopped);
        assert_eq!(sup.get_state("b").unwrap(), ServiceState::Stopped);
    }

    #[test]
    fn stop_semantics() {
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("svc", ServiceFn::new().arc()))
            .unwrap();
        sup.register(
            ServiceSpec::new(
                "stuck",
                ServiceFn::new()
                    .on_stop(|| Err(ServiceError::fail("busy")))
                    .arc(),
            ),
        )
        .unwrap();

        // Stopping a stopped service is a no-op.
        sup.stop("svc").unwrap();
        assert_eq!(sup.get_state("svc").unwrap(), ServiceState::Stopped);

        sup.start("svc").unwrap();
        sup.stop("svc").unwrap();
        assert_eq!(sup.get_state("svc").unwrap(), ServiceState::Stopped);
        assert!(sup.info("svc").unwrap().started_at.is_none());

        sup.start("stuck").unwrap();
        assert!(matches!(
            sup.stop("stuck"),
            Err(SupervisorError::CallbackFailure { .. })
        ));
        assert_eq!(sup.get_state("stuck").unwrap(), ServiceState::Failed);

        assert!(matches!(
            sup.stop("ghost"),
            Err(SupervisorError::NotFound { .. })
        ));
    }

    #[test]
    fn restart_is_stop_then_start() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("svc", journaled("svc", &journal).arc()))
            .unwrap();
        sup.start("svc").unwrap();
        sup.restart("svc").unwrap();
        assert_eq!(*journal.lock().unwrap(), ["start:svc", "stop:svc", "start:svc"]);
        assert_eq!(sup.get_state("svc").unwrap(), ServiceState::Running);
    }

    #[test]
    fn restart_with_failing_start_ends_failed() {
        let allow = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&allow);
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new(
            "svc",
            ServiceFn::new()
                .on_start(move || {
                    if gate.load(Ordering::SeqCst) {
                        Ok(())
                    } else {
                        Err(ServiceError::fail("no"))
                    }
                })
                .arc(),
        ))
        .unwrap();
        sup.start("svc").unwrap();
        allow.store(false, Ordering::SeqCst);

        assert!(sup.restart("svc").is_err());
        assert_eq!(sup.get_state("svc").unwrap(), ServiceState::Failed);
    }

    #[test]
    fn bulk_operations_count_successes() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new("one", journaled("one", &journal).arc()))
            .unwrap();
        sup.register(ServiceSpec::new("bad", failing().arc()))
            .unwrap();
        sup.register(ServiceSpec::new("two", journaled("two", &journal).arc()))
            .unwrap();

        assert_eq!(sup.start_all(), 2);
        assert_eq!(sup.get_state("two").unwrap(), ServiceState::Running);

        // The FAILED service's (default) stop callback succeeds too.
        assert_eq!(sup.stop_all(), 3);
        assert_eq!(
            *journal.lock().unwrap(),
            ["start:one", "start:two", "stop:one", "stop:two"]
        );
    }

    #[test]
    fn unregister_stops_running_and_keeps_order() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        for name in ["a", "b", "c"] {
            sup.register(ServiceSpec::new(name, journaled(name, &journal).arc()))
                .unwrap();
        }
        sup.start("b").unwrap();
        sup.unregister("b").unwrap();

        assert_eq!(*journal.lock().unwrap(), ["start:b", "stop:b"]);
        assert_eq!(sup.list(), ["a", "c"]);
        assert!(matches!(
            sup.get_state("b"),
            Err(SupervisorError::NotFound { .. })
        ));
        assert!(matches!(
            sup.unregister("b"),
            Err(SupervisorError::NotFound { .. })
        ));
    }

    #[test]
    fn unregister_removes_service_whose_stop_fails() {
        let mut sup = Supervisor::new(Config::default());
        let log = lifecycle_log(&mut sup);
        sup.register(ServiceSpec::new(
            "dhcp",
            ServiceFn::new()
                .on_stop(|| Err(ServiceError::fail("lease table busy")))
                .arc(),
        ))
        .unwrap();
        sup.register(ServiceSpec::new("dns", ServiceFn::new().arc()))
            .unwrap();
        sup.start("dhcp").unwrap();

        sup.unregister("dhcp").unwrap();
        assert_eq!(sup.list(), ["dns"]);
        assert!(matches!(
            sup.get_state("dhcp"),
            Err(SupervisorError::NotFound { .. })
        ));

        sup.bus_mut().process();
        let log = log.lock().unwrap();
        assert!(log.contains(&(EventKind::ServiceCrashed, "dhcp".to_string())));
        assert!(!log.contains(&(EventKind::ServiceStopped, "dhcp".to_string())));
    }

    #[test]
    fn register_rejects_duplicates_and_overflow() {
        let mut sup = Supervisor::new(Config {
            max_services: 1,
            ..Config::default()
        });
        sup.register(ServiceSpec::new("a", ServiceFn::new().arc()))
            .unwrap();
        assert!(matches!(
            sup.register(ServiceSpec::new("a", ServiceFn::new().arc())),
            Err(SupervisorError::Duplicate { .. })
        ));
        assert!(matches!(
            sup.register(ServiceSpec::new("b", ServiceFn::new().arc())),
            Err(SupervisorError::Capacity { limit: 1 })
        ));
    }

    #[test]
    fn is_healthy_requires_running() {
        let healthy = Arc::new(AtomicBool::new(true));
        let probe = Arc::clone(&healthy);
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new(
            "svc",
            ServiceFn::new()
                .on_health(move || probe.load(Ordering::SeqCst))
                .arc(),
        ))
        .unwrap();

        assert!(!sup.is_healthy("svc"));
        assert!(!sup.is_healthy("ghost"));
        sup.start("svc").unwrap();
        assert!(sup.is_healthy("svc"));
        healthy.store(false, Ordering::SeqCst);
        assert!(!sup.is_healthy("svc"));
    }

    #[test]
    fn lifecycle_events_reach_subscribers() {
        let mut sup = Supervisor::new(Config::default());
        let log = lifecycle_log(&mut sup);
        sup.register(ServiceSpec::new("ok", ServiceFn::new().arc()))
            .unwrap();
        sup.register(ServiceSpec::new("bad", failing().arc()))
            .unwrap();

        sup.start("ok").unwrap();
        let _ = sup.start("bad");
        sup.stop("ok").unwrap();
        sup.bus_mut().process();

        // SERVICE_CRASHED is High priority, so it is dispatched first.
        assert_eq!(
            *log.lock().unwrap(),
            [
                (EventKind::ServiceCrashed, "bad".to_string()),
                (EventKind::ServiceStarted, "ok".to_string()),
                (EventKind::ServiceStopped, "ok".to_string()),
            ]
        );
    }

    #[test]
    fn lifecycle_events_can_be_disabled() {
        let mut sup = Supervisor::new(Config {
            lifecycle_events: false,
            ..Config::default()
        });
        sup.register(ServiceSpec::new("ok", ServiceFn::new().arc()))
            .unwrap();
        sup.start("ok").unwrap();
        assert_eq!(sup.bus().queue_len(), 0);
    }

    #[test]
    fn panicking_start_marks_failed() {
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new(
            "boom",
            ServiceFn::new().on_start(|| panic!("bad init")).arc(),
        ))
        .unwrap();

        let err = sup.start("boom").unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::CallbackFailure {
                source: ServiceError::Panicked { .. },
                ..
            }
        ));
        assert_eq!(sup.get_state("boom").unwrap(), ServiceState::Failed);
    }

    #[test]
    fn hung_start_times_out() {
        let mut sup = Supervisor::new(Config {
            callback_timeout: Duration::from_millis(20),
            ..Config::default()
        });
        sup.register(ServiceSpec::new(
            "slow",
            ServiceFn::new()
                .on_start(|| {
                    std::thread::sleep(Duration::from_millis(500));
                    Ok(())
                })
                .arc(),
        ))
        .unwrap();

        let err = sup.start("slow").unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::CallbackFailure {
                source: ServiceError::Timeout { .. },
                ..
            }
        ));
        assert_eq!(sup.get_state("slow").unwrap(), ServiceState::Failed);
    }

    #[test]
    fn shutdown_stops_and_clears() {
        let journal = Journal::default();
        let mut sup = Supervisor::new(Config::default());
        let log = lifecycle_log(&mut sup);
        sup.register(ServiceSpec::new("a", journaled("a", &journal).arc()))
            .unwrap();
        sup.start("a").unwrap();

        assert_eq!(sup.shutdown(), 1);
        assert!(sup.is_empty());
        assert_eq!(*journal.lock().unwrap(), ["start:a", "stop:a"]);
        assert_eq!(
            log.lock().unwrap().last().cloned(),
            Some((EventKind::ServiceStopped, "a".to_string()))
        );
    }

    #[test]
    fn services_snapshot_in_registration_order() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let mut sup = Supervisor::new(Config::default());
        sup.register(ServiceSpec::new(
            "z",
            ServiceFn::new()
                .on_start(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .arc(),
        ))
        .unwrap();
        sup.register(ServiceSpec::new("a", ServiceFn::new().arc()).depends_on("z"))
            .unwrap();
        sup.start("a").unwrap();

        let infos = sup.services();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["z", "a"]);
        assert_eq!(infos[1].dependencies, ["z"]);
        assert!(infos.iter().all(|i| i.state == ServiceState::Running));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
