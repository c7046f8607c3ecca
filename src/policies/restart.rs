//! # Restart policy for supervised services.
//!
//! [`RestartPolicy`] decides whether a service that ended up in
//! [`ServiceState::Failed`](crate::ServiceState::Failed) is retried by the
//! periodic [`tick`](crate::Supervisor::tick).
//!
//! ```text
//! RestartPolicy::Never      → FAILED stays FAILED until someone calls start/restart
//! RestartPolicy::OnFailure  → FAILED → RESTARTING → start() after the backoff delay
//! ```
//!
//! Manual [`restart`](crate::Supervisor::restart) works under both policies.

/// Policy controlling whether a failed service is restarted automatically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart automatically.
    #[default]
    Never,
    /// Restart after failure, subject to the service's backoff and restart budget.
    OnFailure,
}

impl RestartPolicy {
    /// Returns `true` when failed services are retried by `tick`.
    #[inline]
    pub fn restarts_on_failure(self) -> bool {
        matches!(self, RestartPolicy::OnFailure)
    }
}
