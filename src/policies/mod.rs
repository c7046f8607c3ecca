//! Auto-restart policies.
//!
//! This module groups the knobs that control **whether** a FAILED service is
//! restarted by [`Supervisor::tick`](crate::Supervisor::tick) and **how long**
//! the supervisor waits between attempts.
//!
//! ## Contents
//! - [`RestartPolicy`] whether a failed service is restarted automatically
//! - [`BackoffPolicy`] delay before each attempt (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of that delay
//!
//! ## Quick wiring
//! ```text
//! ServiceSpec { restart, backoff, max_restarts, reset_after }
//!      └─► Supervisor::tick(now) uses:
//!           - restart to decide whether FAILED services are retried at all
//!           - max_restarts to stop retrying (0 = unlimited)
//!           - backoff.delay(n) as the wait after n previous attempts
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Never` for a bare [`ServiceSpec::new`](crate::ServiceSpec::new).
//! - `BackoffPolicy::default()` → 1s constant delay, no jitter.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
