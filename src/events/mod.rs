//! Events: data model, bounded priority queue and the bus.
//!
//! ## Contents
//! - [`EventKind`], [`Priority`], [`Event`], [`EventFilter`] event classification and payload
//! - [`EventQueue`] bounded, stable priority queue over a recycling node arena
//! - [`Bus`] subscription table + queue, drained synchronously by [`Bus::process`]
//!
//! ## Quick reference
//! - **Publishers**: the `Supervisor` (lifecycle events), application code
//!   (network, config, firmware, reboot notifications).
//! - **Consumers**: [`Subscribe`](crate::Subscribe) implementors registered with
//!   [`Bus::subscribe`]; invoked on the thread that calls `process()`.

mod bus;
mod event;
mod queue;

pub use bus::{Bus, SubscriptionId};
pub use event::{Event, EventFilter, EventKind, MAX_SOURCE_LEN, Priority};
pub use queue::{EventQueue, Iter as QueueIter};
