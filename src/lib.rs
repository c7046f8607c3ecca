//! # svcvisor
//!
//! **Svcvisor** is the control core of an embedded/router firmware: a
//! **service lifecycle supervisor** coupled to a **priority event bus**.
//!
//! Services declare start/stop/health callbacks and the services they depend
//! on. The supervisor starts them dependencies-first, tracks their lifecycle
//! state, probes their health and restarts failed ones with backoff. Every
//! lifecycle change is published on a bounded, priority-ordered bus that other
//! subsystems subscribe to.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ServiceSpec  │   │ ServiceSpec  │   │ ServiceSpec  │
//!     │    (net)     │   │ (dhcp → net) │   │ (web → dhcp) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (single control-thread owner)                         │
//! │  - Registry (registration order, name index, bound)               │
//! │  - Resolver (cycle check, dependencies-first start walk)          │
//! │  - Health monitor + restart policy (tick)                         │
//! │  - Bus (subscription table + bounded priority queue)              │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ start/stop/health callbacks         │ publish
//!        ▼                                     ▼  SERVICE_STARTED / STOPPED / CRASHED
//!   Service impls                     ┌──────────────────────────┐
//!   (ServiceFn / custom)              │ EventQueue (K bounded)   │◄── other publishers
//!                                     │ priority desc, FIFO eq.  │    (net, config, fw)
//!                                     └────────────┬─────────────┘
//!                                                  ▼ Bus::process()
//!                                      sub1.on_event  sub2.on_event ... (slot order)
//! ```
//!
//! ### Driving loop
//! ```text
//! loop every tick_interval {
//!   ├─► Supervisor::tick(now)
//!   │     ├─ RUNNING → health probe → (unhealthy) FAILED
//!   │     └─ FAILED  → auto-restart after backoff, within max_restarts
//!   └─► Bus::process()  → dispatch queued events, highest priority first
//! }
//! ```
//! Call [`Supervisor::cycle`] from your own loop, or hand the supervisor to
//! [`Runtime`] and talk to it through a [`SupervisorHandle`].
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                            |
//! |-------------------|--------------------------------------------------------------------|-----------------------------------------------|
//! | **Services**      | Define services from closures or trait impls, with dependencies.  | [`Service`], [`ServiceFn`], [`ServiceSpec`]   |
//! | **Supervision**   | Lifecycle state machine, bulk ops, queries, health and restarts.  | [`Supervisor`], [`ServiceState`], [`TickReport`] |
//! | **Events**        | Bounded priority pub/sub with deterministic ordering.             | [`Bus`], [`Event`], [`EventKind`], [`Priority`] |
//! | **Subscriber API**| React to events (logging, counters, custom handlers).             | [`Subscribe`], [`SubscriberFn`], [`LogWriter`] |
//! | **Policies**      | Restart/backoff/jitter strategies.                                | [`RestartPolicy`], [`BackoffPolicy`]          |
//! | **Async driver**  | Tokio loop + command channel for multi-task management surfaces.  | [`Runtime`], [`SupervisorHandle`]             |
//! | **Errors**        | Typed errors for lifecycle, bus, callbacks and the driver.        | [`SupervisorError`], [`BusError`], [`RuntimeError`] |
//! | **Configuration** | Bounds and per-service defaults.                                  | [`Config`]                                    |
//!
//! ## Example
//! ```rust
//! use std::time::{Duration, Instant};
//! use svcvisor::{
//!     Config, EventFilter, LogWriter, ServiceError, ServiceFn, ServiceSpec, ServiceState, Supervisor,
//! };
//!
//! let mut sup = Supervisor::builder(Config::default())
//!     .with_subscriber(EventFilter::All, Box::new(LogWriter::new()))
//!     .with_service(ServiceSpec::new("net", ServiceFn::new().arc()))
//!     .with_service(
//!         ServiceSpec::builder("ntp")
//!             .depends_on("net")
//!             .auto_restart(Duration::from_secs(1), 3)
//!             .build_fn(ServiceFn::new().on_start(|| Err(ServiceError::fail("no upstream")))),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(sup.start("ntp").is_err());
//! assert_eq!(sup.get_state("net").unwrap(), ServiceState::Running);
//! assert_eq!(sup.get_state("ntp").unwrap(), ServiceState::Failed);
//!
//! // One loop iteration: health + restarts, then event dispatch.
//! let (_report, dispatched) = sup.cycle(Instant::now());
//! assert_eq!(dispatched, 2); // SERVICE_STARTED(net), SERVICE_CRASHED(ntp)
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod services;
mod subscribers;

// ---- Public re-exports ----

pub use crate::config::Config;
pub use crate::core::{
    LIFECYCLE_SOURCE, Runtime, ServiceInfo, ServiceState, Supervisor, SupervisorBuilder,
    SupervisorHandle, TickReport,
};
pub use crate::error::{BusError, RuntimeError, ServiceError, SupervisorError};
pub use crate::events::{
    Bus, Event, EventFilter, EventKind, EventQueue, MAX_SOURCE_LEN, Priority, QueueIter,
    SubscriptionId,
};
pub use crate::policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use crate::services::{Service, ServiceFn, ServiceRef, ServiceSpec, ServiceSpecBuilder};
pub use crate::subscribers::{LogWriter, Subscribe, SubscriberFn};
