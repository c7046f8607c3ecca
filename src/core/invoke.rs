//! # Callback invocation.
//!
//! Every start/stop/health callback goes through [`call`]:
//! - panics are caught and turned into [`ServiceError::Panicked`];
//! - with a bounded wait configured, the callback runs on a helper thread and
//!   the caller gives up after the wait with [`ServiceError::Timeout`]. The
//!   helper thread is detached and finishes (or hangs) on its own.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use crate::error::{ServiceError, panic_info};
use crate::services::{Service, ServiceRef};

fn panicked(payload: Box<dyn Any + Send>) -> ServiceError {
    ServiceError::Panicked {
        info: panic_info(payload.as_ref()),
    }
}

/// Runs `f` against `service`, inline or under a bounded wait.
pub(crate) fn call<T, F>(
    service: &ServiceRef,
    timeout: Option<Duration>,
    f: F,
) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Service) -> T + Send + 'static,
{
    let Some(timeout) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| f(&**service))).map_err(panicked);
    };

    let service = Arc::clone(service);
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("svcvisor-callback".into())
        .spawn(move || {
            let res = panic::catch_unwind(AssertUnwindSafe(|| f(&*service)));
            let _ = tx.send(res.map_err(panicked));
        })
        .map_err(|e| ServiceError::fail(format!("spawn callback thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(res) => res,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ServiceError::Timeout { timeout }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ServiceError::Panicked {
            info: "callback thread exited without a result".into(),
        }),
    }
}

pub(crate) fn start(service: &ServiceRef, timeout: Option<Duration>) -> Result<(), ServiceError> {
    call(service, timeout, |s| s.start()).and_then(|r| r)
}

pub(crate) fn stop(service: &ServiceRef, timeout: Option<Duration>) -> Result<(), ServiceError> {
    call(service, timeout, |s| s.stop()).and_then(|r| r)
}

pub(crate) fn health(service: &ServiceRef, timeout: Option<Duration>) -> Result<bool, ServiceError> {
    call(service, timeout, |s| s.health())
}
