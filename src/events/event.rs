//! # Events carried by the bus.
//!
//! The [`EventKind`] catalogue covers the control-plane notifications of a
//! router firmware:
//! - **Network**: interface up/down, connection established/lost
//! - **Configuration**: config changed
//! - **Firmware update**: started, completed, failed
//! - **Service lifecycle**: started, stopped, crashed (published by the supervisor)
//! - **System**: reboot, plus `Custom` for anything else
//!
//! An [`Event`] additionally carries a [`Priority`], the enqueue timestamp,
//! a per-bus sequence number, optional payload bytes and a short source tag.
//!
//! ## Example
//! ```rust
//! use svcvisor::{Event, EventKind, Priority};
//!
//! let ev = Event::new(EventKind::ConfigChanged)
//!     .with_priority(Priority::High)
//!     .with_payload(b"wan.mtu".to_vec())
//!     .with_source("config");
//!
//! assert_eq!(ev.kind, EventKind::ConfigChanged);
//! assert_eq!(ev.payload(), Some(&b"wan.mtu"[..]));
//! assert_eq!(ev.source, "config");
//! ```

use std::fmt;
use std::time::SystemTime;

/// Longest source tag kept, in bytes. Longer tags are cut at a char boundary.
pub const MAX_SOURCE_LEN: usize = 63;

/// Classification of bus events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A network interface came up.
    NetworkInterfaceUp,
    /// A network interface went down.
    NetworkInterfaceDown,
    /// An upstream connection was established.
    ConnectionEstablished,
    /// An upstream connection was lost.
    ConnectionLost,
    /// The configuration document changed.
    ConfigChanged,
    /// A firmware update began.
    FirmwareUpdateStarted,
    /// A firmware update finished successfully.
    FirmwareUpdateCompleted,
    /// A firmware update failed.
    FirmwareUpdateFailed,
    /// A supervised service reached RUNNING. Payload: service name.
    ServiceStarted,
    /// A supervised service reached STOPPED. Payload: service name.
    ServiceStopped,
    /// A supervised service entered FAILED. Payload: service name.
    ServiceCrashed,
    /// The system is about to reboot.
    SystemReboot,
    /// Application-defined event; interpret the payload by `source`.
    Custom,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::NetworkInterfaceUp => "network-interface-up",
            EventKind::NetworkInterfaceDown => "network-interface-down",
            EventKind::ConnectionEstablished => "connection-established",
            EventKind::ConnectionLost => "connection-lost",
            EventKind::ConfigChanged => "config-changed",
            EventKind::FirmwareUpdateStarted => "firmware-update-started",
            EventKind::FirmwareUpdateCompleted => "firmware-update-completed",
            EventKind::FirmwareUpdateFailed => "firmware-update-failed",
            EventKind::ServiceStarted => "service-started",
            EventKind::ServiceStopped => "service-stopped",
            EventKind::ServiceCrashed => "service-crashed",
            EventKind::SystemReboot => "system-reboot",
            EventKind::Custom => "custom",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Dispatch priority. Higher priorities are dispatched first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Background notifications.
    Low,
    /// Regular notifications (default).
    #[default]
    Normal,
    /// Should be handled before regular traffic.
    High,
    /// Handled before everything else.
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        })
    }
}

/// Which events a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Every event.
    All,
    /// Only events of this kind.
    Kind(EventKind),
}

impl EventFilter {
    /// Returns `true` if `kind` passes the filter.
    #[inline]
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kind(k) => k == kind,
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        EventFilter::Kind(kind)
    }
}

/// A bus event.
///
/// Events handed to subscribers live in queue-owned storage: `seq` and `at`
/// are assigned when the event is enqueued, not when it is built.
#[derive(Clone, Debug)]
pub struct Event {
    /// Event classification.
    pub kind: EventKind,
    /// Dispatch priority.
    pub priority: Priority,
    /// Per-bus enqueue counter; orders events published on the same bus.
    pub seq: u64,
    /// Wall-clock enqueue timestamp.
    pub at: SystemTime,
    /// Opaque payload; empty means "no payload".
    pub payload: Vec<u8>,
    /// Free-text origin tag (at most [`MAX_SOURCE_LEN`] bytes once enqueued).
    pub source: String,
}

impl Event {
    /// Creates an event of `kind` with `Normal` priority, no payload and an empty source.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            priority: Priority::Normal,
            seq: 0,
            at: SystemTime::UNIX_EPOCH,
            payload: Vec::new(),
            source: String::new(),
        }
    }

    /// Sets the priority.
    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches payload bytes.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Sets the source tag.
    #[inline]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Payload bytes, or `None` when the event has no payload.
    #[inline]
    pub fn payload(&self) -> Option<&[u8]> {
        (!self.payload.is_empty()).then_some(self.payload.as_slice())
    }

    /// Payload interpreted as UTF-8 (lifecycle events carry the service name this way).
    #[inline]
    pub fn payload_str(&self) -> Option<&str> {
        self.payload().and_then(|p| std::str::from_utf8(p).ok())
    }
}

/// Longest prefix of `source` that fits [`MAX_SOURCE_LEN`] without splitting a char.
pub(crate) fn clip_source(source: &str) -> &str {
    if source.len() <= MAX_SOURCE_LEN {
        return source;
    }
    let mut end = MAX_SOURCE_LEN;
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    &source[..end]
}
