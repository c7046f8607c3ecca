//! # Health monitor and restart policy.
//!
//! [`Supervisor::tick`] is called by the owning loop with the current instant.
//! For every service, in registration order:
//!
//! ```text
//! RUNNING ─► health probe
//!              ├─ healthy   → reset restart_count if reset_after elapsed since started_at
//!              └─ unhealthy → fail_unhealthy ? FAILED (SERVICE_CRASHED) : log only
//!
//! FAILED ──► restart policy
//!              ├─ Never / budget exhausted        → stays FAILED
//!              ├─ no delay window open yet        → open it at `now`, go on
//!              ├─ now − window start < delay      → wait
//!              └─ else → restart_count += 1, last_restart = now,
//!                        RESTARTING → start(name)
//! ```
//!
//! ## Rules
//! - The delay window of the first automatic attempt opens on the first tick
//!   that observes the failure (or at `now` for health failures detected by the tick);
//!   with a zero delay that same tick restarts the service.
//!   Later windows start at the most recent of `last_restart` and that observation.
//! - The delay for the attempt after `n` previous attempts is `backoff.delay(n)`,
//!   drawn once and kept until the attempt happens.
//! - `restart_count` never exceeds a non-zero `max_restarts`; manual `restart`
//!   is not counted and still works after the budget is spent.

use std::time::Instant;

use tracing::{info, warn};

use crate::core::invoke;
use crate::core::state::ServiceState;
use crate::core::supervisor::Supervisor;

/// What one [`Supervisor::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// RUNNING services whose health was probed.
    pub checked: usize,
    /// Probes that reported unhealthy (or failed to answer).
    pub unhealthy: usize,
    /// Automatic restart attempts made.
    pub restarted: usize,
    /// Restart counters cleared after a sustained healthy run.
    pub reset: usize,
}

impl Supervisor {
    /// Runs health checks and the restart policy once.
    ///
    /// # Example
    /// ```rust
    /// use std::time::{Duration, Instant};
    /// use svcvisor::{Config, ServiceError, ServiceFn, ServiceSpec, ServiceState, Supervisor};
    ///
    /// let mut sup = Supervisor::new(Config::default());
    /// let net = ServiceSpec::builder("net")
    ///     .auto_restart(Duration::from_millis(1000), 3)
    ///     .build_fn(ServiceFn::new().on_start(|| Err(ServiceError::fail("no link"))));
    /// sup.register(net).unwrap();
    /// assert!(sup.start("net").is_err());
    ///
    /// let t0 = Instant::now();
    /// assert_eq!(sup.tick(t0).restarted, 0);
    /// assert_eq!(sup.tick(t0 + Duration::from_millis(1000)).restarted, 1);
    /// assert_eq!(sup.info("net").unwrap().restart_count, 1);
    /// assert_eq!(sup.get_state("net").unwrap(), ServiceState::Failed);
    /// ```
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        for name in self.registry.names() {
            match self.registry.get(&name).map(|e| e.state) {
                Some(ServiceState::Running) => self.check_health(&name, now, &mut report),
                Some(ServiceState::Failed) => self.maybe_restart(&name, now, &mut report),
                _ => {}
            }
        }
        report
    }

    fn check_health(&mut self, name: &str, now: Instant, report: &mut TickReport) {
        let Some(service) = self.registry.get(name).map(|e| e.spec.service().clone()) else {
            return;
        };
        report.checked += 1;

        let healthy = match invoke::health(&service, self.cfg.callback_timeout()) {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(service = %name, error = %e, "health probe failed");
                false
            }
        };

        if healthy {
            let Some(entry) = self.registry.get_mut(name) else {
                return;
            };
            if let (Some(window), Some(started)) = (entry.spec.reset_after(), entry.started_at) {
                if entry.restart_count > 0 && now.saturating_duration_since(started) >= window {
                    info!(service = %name, restarts = entry.restart_count, "restart counter reset after healthy run");
                    entry.restart_count = 0;
                    entry.last_restart = None;
                    report.reset += 1;
                }
            }
            return;
        }

        report.unhealthy += 1;
        if self.cfg.fail_unhealthy {
            warn!(service = %name, "service unhealthy, marking failed");
            self.mark_failed(name, Some(now));
        } else {
            warn!(service = %name, "service unhealthy");
        }
    }

    fn maybe_restart(&mut self, name: &str, now: Instant, report: &mut TickReport) {
        let Some(entry) = self.registry.get_mut(name) else {
            return;
        };
        if !entry.spec.auto_restart() || entry.exhausted() {
            return;
        }

        let window = match (entry.last_restart, entry.failed_seen) {
            (Some(a), Some(b)) => a.max(b),
            (a, b) => a.or(b).unwrap_or_else(|| *entry.failed_seen.insert(now)),
        };
        let attempts = entry.restart_count;
        let backoff = entry.spec.backoff();
        let delay = *entry.retry_delay.get_or_insert_with(|| backoff.delay(attempts));
        if now.saturating_duration_since(window) < delay {
            return;
        }

        entry.restart_count += 1;
        entry.last_restart = Some(now);
        entry.retry_delay = None;
        entry.state = ServiceState::Restarting;
        let attempt = entry.restart_count;
        let max = entry.spec.max_restarts();
        report.restarted += 1;
        info!(service = %name, attempt, max, ?delay, "auto-restarting service");

        if let Err(e) = self.start_at(name, now) {
            warn!(service = %name, attempt, error = %e, "auto-restart failed");
            if self.registry.get(name).map(|entry| entry.state) == Some(ServiceState::Restarting) {
                self.mark_failed(name, Some(now));
            }
            if max > 0 && attempt >= max {
                warn!(service = %name, max, "restart budget exhausted");
            }
        }
    }
}
