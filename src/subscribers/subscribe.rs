//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for reacting to bus events. A subscriber
//! is registered with a filter via [`Bus::subscribe`](crate::Bus::subscribe) and
//! is called synchronously from [`Bus::process`](crate::Bus::process) for every
//! matching event.
//!
//! ## Rules
//! - Subscribers run on the thread that drains the bus, one after another, in
//!   subscription-table slot order.
//! - `on_event` must not block for long: the whole control loop waits on it.
//! - A panicking subscriber is contained and logged; the remaining subscribers
//!   still receive the event.
//!
//! ## Example
//! ```rust
//! use svcvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct CrashCounter {
//!     crashes: u32,
//! }
//!
//! impl Subscribe for CrashCounter {
//!     fn on_event(&mut self, ev: &Event) {
//!         if ev.kind == EventKind::ServiceCrashed {
//!             self.crashes += 1;
//!         }
//!     }
//!
//!     fn name(&self) -> &str {
//!         "crash-counter"
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::events::Event;

/// Contract for bus subscribers.
pub trait Subscribe: Send + 'static {
    /// Handles one dispatched event.
    fn on_event(&mut self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed subscriber.
///
/// ## Example
/// ```rust
/// use svcvisor::{Bus, EventKind, Priority, SubscriberFn};
///
/// let mut bus = Bus::new(16, 8);
/// bus.subscribe(
///     EventKind::SystemReboot,
///     SubscriberFn::boxed("reboot-notice", |ev| {
///         assert_eq!(ev.kind, EventKind::SystemReboot);
///     }),
/// )
/// .unwrap();
///
/// bus.publish_simple(EventKind::SystemReboot, Priority::Critical, None, "cli").unwrap();
/// assert_eq!(bus.process(), 1);
/// ```
pub struct SubscriberFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubscriberFn<F>
where
    F: FnMut(&Event) + Send + 'static,
{
    /// Wraps a closure as a subscriber.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Wraps a closure and boxes it, ready for [`Bus::subscribe`](crate::Bus::subscribe).
    pub fn boxed(name: impl Into<Cow<'static, str>>, f: F) -> Box<dyn Subscribe> {
        Box::new(Self::new(name, f))
    }
}

impl<F> Subscribe for SubscriberFn<F>
where
    F: FnMut(&Event) + Send + 'static,
{
    fn on_event(&mut self, event: &Event) {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for SubscriberFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
