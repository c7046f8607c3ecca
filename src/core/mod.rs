//! Supervision core: registry, lifecycle, health/restart policy and the async driver.
//!
//! The public API from this module is [`Supervisor`] (plus its builder,
//! snapshots and the [`Runtime`] driver).
//!
//! Internal modules:
//! - [`registry`]: ordered, bounded service table with name index;
//! - [`resolver`]: dependency cycle detection before a start walk;
//! - [`invoke`]: callback invocation with panic capture and optional bounded wait;
//! - [`supervisor`]: lifecycle state machine, bulk operations, queries;
//! - [`health`]: periodic `tick` (health probes + auto-restart with backoff);
//! - [`runtime`]: tokio loop owning the supervisor, command channel handle;
//! - [`shutdown`]: OS termination signal listeners.

mod builder;
mod health;
mod invoke;
mod registry;
mod resolver;
mod runtime;
mod shutdown;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use health::TickReport;
pub use runtime::{Runtime, SupervisorHandle};
pub use state::{ServiceInfo, ServiceState};
pub use supervisor::{LIFECYCLE_SOURCE, Supervisor};
