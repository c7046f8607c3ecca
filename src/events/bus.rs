//! # Priority event bus.
//!
//! [`Bus`] couples a subscription table with an [`EventQueue`]. Publishing only
//! enqueues; delivery happens when the owning loop calls [`Bus::process`].
//!
//! ## Architecture
//! ```text
//! Publishers:                         Owning loop (once per cycle):
//!   Supervisor ──┐                      Bus::process()
//!   net monitor ─┼──► publish() ──►       └─► EventQueue::drain_with(dispatch)
//!   config ──────┘   (copy + stamp)             └─► slot order: on_event(&Event)
//! ```
//!
//! ## Rules
//! - **Copying publish**: the event (payload and source included) is copied into
//!   queue-owned storage; the caller keeps its own value.
//! - **Bounded**: at most `queue_capacity` undispatched events. Publishing into a
//!   full queue logs, drops the new event and returns [`BusError::QueueFull`].
//! - **Ordering**: highest priority first, FIFO among equal priorities.
//! - **Fan-out order**: every active subscription whose filter matches, in slot
//!   order. Slots freed by `unsubscribe` are reused by later `subscribe` calls.
//! - **Ids**: subscription ids start at 1 and are never reused.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use svcvisor::{Bus, EventKind, Priority, SubscriberFn};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let mut bus = Bus::new(32, 8);
//! bus.subscribe(
//!     EventKind::ConfigChanged,
//!     SubscriberFn::boxed("cfg-watch", move |ev| sink.lock().unwrap().push(ev.seq)),
//! )
//! .unwrap();
//!
//! let seq = bus
//!     .publish_simple(EventKind::ConfigChanged, Priority::Normal, Some(b"lan"), "config")
//!     .unwrap();
//! bus.process();
//! assert_eq!(*seen.lock().unwrap(), vec![seq]);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace, warn};

use crate::config::Config;
use crate::error::{BusError, panic_info};
use crate::events::event::{Event, EventFilter, EventKind, Priority};
use crate::events::queue::EventQueue;
use crate::subscribers::Subscribe;

/// Identifier returned by [`Bus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw id value (starts at 1).
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Box<dyn Subscribe>,
}

/// Subscription table plus bounded priority queue.
pub struct Bus {
    queue: EventQueue,
    slots: Vec<Option<Subscription>>,
    limit: Option<usize>,
    last_id: u64,
}

impl Bus {
    /// Creates a bus holding at most `queue_capacity` events (min 1) and
    /// `max_subscriptions` active subscriptions (`0` = unbounded).
    pub fn new(queue_capacity: usize, max_subscriptions: usize) -> Self {
        Self {
            queue: EventQueue::new(queue_capacity),
            slots: Vec::new(),
            limit: (max_subscriptions != 0).then_some(max_subscriptions),
            last_id: 0,
        }
    }

    /// Creates a bus sized by `cfg.queue_capacity` and `cfg.max_subscriptions`.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.queue_capacity_clamped(), cfg.max_subscriptions)
    }

    /// Registers `handler` for events passing `filter`.
    ///
    /// The subscription takes the first free slot. Fails with
    /// [`BusError::Capacity`] when every slot up to the bound is taken.
    pub fn subscribe(
        &mut self,
        filter: impl Into<EventFilter>,
        handler: Box<dyn Subscribe>,
    ) -> Result<SubscriptionId, BusError> {
        let filter = filter.into();
        let slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => match self.limit {
                Some(limit) if self.slots.len() >= limit => {
                    warn!(limit, subscriber = handler.name(), "no free subscription slots");
                    return Err(BusError::Capacity { limit });
                }
                _ => {
                    self.slots.push(None);
                    self.slots.len() - 1
                }
            },
        };

        self.last_id += 1;
        let id = SubscriptionId(self.last_id);
        debug!(%id, slot, ?filter, subscriber = handler.name(), "subscription created");
        self.slots[slot] = Some(Subscription {
            id,
            filter,
            handler,
        });
        Ok(id)
    }

    /// Deactivates the subscription `id`, freeing its slot.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), BusError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|sub| sub.id == id))
            .ok_or(BusError::NotFound { id })?;
        *slot = None;
        debug!(%id, "subscription removed");
        Ok(())
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Copies `event` into the queue, stamping its timestamp and sequence number.
    ///
    /// Returns the assigned sequence number.
    pub fn publish(&mut self, event: &Event) -> Result<u64, BusError> {
        self.enqueue(event.kind, event.priority, &event.payload, &event.source)
    }

    /// Publishes an event built from parts, copying `payload` and `source`.
    pub fn publish_simple(
        &mut self,
        kind: EventKind,
        priority: Priority,
        payload: Option<&[u8]>,
        source: &str,
    ) -> Result<u64, BusError> {
        self.enqueue(kind, priority, payload.unwrap_or_default(), source)
    }

    fn enqueue(
        &mut self,
        kind: EventKind,
        priority: Priority,
        payload: &[u8],
        source: &str,
    ) -> Result<u64, BusError> {
        match self.queue.push(kind, priority, payload, source) {
            Ok(seq) => {
                trace!(seq, %kind, %priority, source, "event queued");
                Ok(seq)
            }
            Err(e) => {
                warn!(%kind, %priority, source, error = %e, "dropping event");
                Err(e)
            }
        }
    }

    /// Dispatches every queued event, highest priority first, to each matching
    /// subscription. Returns the number of events dispatched.
    pub fn process(&mut self) -> usize {
        let slots = &mut self.slots;
        let dispatched = self.queue.drain_with(|ev| dispatch(slots, ev));
        if dispatched > 0 {
            trace!(dispatched, "bus drained");
        }
        dispatched
    }

    /// Discards every queued event without dispatching. Returns the number discarded.
    pub fn clear(&mut self) -> usize {
        self.queue.clear()
    }

    /// Number of queued, undispatched events.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Read access to the queue (inspection, metrics).
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Tears the bus down: drops queued events, releases node storage and
    /// deactivates every subscription. Ids keep increasing if the bus is reused.
    pub fn shutdown(&mut self) {
        let dropped = self.queue.len();
        self.queue.reset();
        let subscriptions = self.subscription_count();
        self.slots.clear();
        debug!(dropped, subscriptions, "bus shut down");
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("queued", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

fn dispatch(slots: &mut [Option<Subscription>], ev: &Event) {
    for sub in slots.iter_mut().flatten() {
        if !sub.filter.matches(ev.kind) {
            continue;
        }
        let handler = &mut sub.handler;
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_event(ev))) {
            error!(
                subscriber = sub.handler.name(),
                id = %sub.id,
                kind = %ev.kind,
                info = %panic_info(panic.as_ref()),
                "subscriber panicked"
            );
        }
    }
}
