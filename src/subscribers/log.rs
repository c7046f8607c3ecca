//! # LogWriter: event logger
//!
//! A subscriber that writes every dispatched [`Event`] to `tracing`.
//! Subscribe it with [`EventFilter::All`](crate::EventFilter::All) to get a
//! line per event in the control loop's log.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO svcvisor::subscribers::log: [service-started] seq=4 priority=normal source="supervisor" service="dhcp"
//! WARN svcvisor::subscribers::log: [service-crashed] seq=5 priority=high source="supervisor" service="ntp"
//! INFO svcvisor::subscribers::log: [config-changed] seq=6 priority=normal source="config" payload_len=7
//! ```

use tracing::{info, warn};

use crate::events::{Event, EventKind, Priority};
use crate::subscribers::Subscribe;

/// Event logging subscriber.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&mut self, e: &Event) {
        let label = e.kind.as_label();
        match e.kind {
            EventKind::ServiceStarted | EventKind::ServiceStopped | EventKind::ServiceCrashed => {
                let service = e.payload_str().unwrap_or("unknown");
                if e.kind == EventKind::ServiceCrashed {
                    warn!(seq = e.seq, priority = %e.priority, source = %e.source, service, "[{label}]");
                } else {
                    info!(seq = e.seq, priority = %e.priority, source = %e.source, service, "[{label}]");
                }
            }
            _ if e.priority >= Priority::High => {
                warn!(seq = e.seq, priority = %e.priority, source = %e.source, payload_len = e.payload.len(), "[{label}]");
            }
            _ => {
                info!(seq = e.seq, priority = %e.priority, source = %e.source, payload_len = e.payload.len(), "[{label}]");
            }
        }
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}
