//! # Async driver: one task owns the supervisor, everyone else sends commands.
//!
//! The [`Supervisor`] is single-owner (`&mut self`). [`Runtime`] moves it onto
//! one tokio task and serializes every mutation through a bounded command
//! channel; [`SupervisorHandle`] is the cloneable sending side used by
//! management surfaces running on other tasks or threads.
//!
//! ## Loop
//! ```text
//! Runtime::run(token)
//!   loop select! (biased) {
//!     token.cancelled()  → break
//!     interval.tick()    → supervisor.cycle(now)      (tick + bus.process)
//!     rx.recv()          → cmd.apply(&mut supervisor) → reply over oneshot
//!   }
//!   supervisor.shutdown()  (stop-all, deliver events, clear registry)
//! ```
//!
//! ## Rules
//! - Commands are applied one at a time, in arrival order, between cycles.
//!   A due cycle runs before pending commands, so a busy channel cannot hold back ticks.
//! - Starts issued through the handle are stamped with the loop's clock.
//! - Events published through the handle are dispatched on the next cycle.
//! - Once `run` has returned, every handle call fails with [`RuntimeError::Closed`].
//!
//! ## Example
//! ```rust
//! use svcvisor::{Config, Runtime, ServiceFn, ServiceSpec, ServiceState, Supervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), svcvisor::RuntimeError> {
//!     let runtime = Runtime::new(Supervisor::new(Config::default()));
//!     let handle = runtime.handle();
//!     let token = CancellationToken::new();
//!     let driver = tokio::spawn(runtime.run(token.clone()));
//!
//!     handle.register(ServiceSpec::new("ntp", ServiceFn::new().arc())).await?;
//!     handle.start("ntp").await?;
//!     assert_eq!(handle.state("ntp").await?, ServiceState::Running);
//!
//!     token.cancel();
//!     let sup = driver.await.expect("driver task");
//!     assert!(sup.is_empty());
//!     Ok(())
//! }
//! ```

use std::io;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::core::shutdown::Signals;
use crate::core::state::{ServiceInfo, ServiceState};
use crate::core::supervisor::Supervisor;
use crate::error::{BusError, RuntimeError, SupervisorError};
use crate::events::{Event, EventFilter, SubscriptionId};
use crate::services::ServiceSpec;
use crate::subscribers::Subscribe;

type Reply<T> = oneshot::Sender<T>;

/// The loop's clock; follows tokio's paused time in tests.
fn clock() -> std::time::Instant {
    time::Instant::now().into_std()
}

enum Command {
    Register {
        spec: ServiceSpec,
        reply: Reply<Result<(), SupervisorError>>,
    },
    Unregister {
        name: String,
        reply: Reply<Result<(), SupervisorError>>,
    },
    Start {
        name: String,
        reply: Reply<Result<(), SupervisorError>>,
    },
    Stop {
        name: String,
        reply: Reply<Result<(), SupervisorError>>,
    },
    Restart {
        name: String,
        reply: Reply<Result<(), SupervisorError>>,
    },
    StartAll {
        reply: Reply<usize>,
    },
    StopAll {
        reply: Reply<usize>,
    },
    State {
        name: String,
        reply: Reply<Result<ServiceState, SupervisorError>>,
    },
    IsHealthy {
        name: String,
        reply: Reply<bool>,
    },
    List {
        reply: Reply<Vec<String>>,
    },
    Services {
        reply: Reply<Vec<ServiceInfo>>,
    },
    Publish {
        event: Event,
        reply: Option<Reply<Result<u64, BusError>>>,
    },
    Subscribe {
        filter: EventFilter,
        subscriber: Box<dyn Subscribe>,
        reply: Reply<Result<SubscriptionId, BusError>>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: Reply<Result<(), BusError>>,
    },
}

impl Command {
    /// Applies the command. A dropped reply receiver only means the caller stopped waiting.
    fn apply(self, sup: &mut Supervisor) {
        match self {
            Command::Register { spec, reply } => {
                let _ = reply.send(sup.register(spec));
            }
            Command::Unregister { name, reply } => {
                let _ = reply.send(sup.unregister(&name));
            }
            Command::Start { name, reply } => {
                let _ = reply.send(sup.start_at(&name, clock()));
            }
            Command::Stop { name, reply } => {
                let _ = reply.send(sup.stop(&name));
            }
            Command::Restart { name, reply } => {
                let _ = reply.send(sup.restart_at(&name, clock()));
            }
            Command::StartAll { reply } => {
                let _ = reply.send(sup.start_all_at(clock()));
            }
            Command::StopAll { reply } => {
                let _ = reply.send(sup.stop_all());
            }
            Command::State { name, reply } => {
                let _ = reply.send(sup.get_state(&name));
            }
            Command::IsHealthy { name, reply } => {
                let _ = reply.send(sup.is_healthy(&name));
            }
            Command::List { reply } => {
                let _ = reply.send(sup.list());
            }
            Command::Services { reply } => {
                let _ = reply.send(sup.services());
            }
            Command::Publish { event, reply } => {
                let res = sup.bus_mut().publish(&event);
                if let Some(reply) = reply {
                    let _ = reply.send(res);
                }
            }
            Command::Subscribe {
                filter,
                subscriber,
                reply,
            } => {
                let _ = reply.send(sup.bus_mut().subscribe(filter, subscriber));
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(sup.bus_mut().unsubscribe(id));
            }
        }
    }
}

/// Handle for sending commands to a running [`Runtime`].
#[derive(Clone, Debug)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Command>,
}

impl SupervisorHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// See [`Supervisor::register`].
    pub async fn register(&self, spec: ServiceSpec) -> Result<(), RuntimeError> {
        Ok(self
            .request(|reply| Command::Register { spec, reply })
            .await??)
    }

    /// See [`Supervisor::unregister`].
    pub async fn unregister(&self, name: impl Into<String>) -> Result<(), RuntimeError> {
        let name = name.into();
        Ok(self
            .request(|reply| Command::Unregister { name, reply })
            .await??)
    }

    /// See [`Supervisor::start`].
    pub async fn start(&self, name: impl Into<String>) -> Result<(), RuntimeError> {
        let name = name.into();
        Ok(self.request(|reply| Command::Start { name, reply }).await??)
    }

    /// See [`Supervisor::stop`].
    pub async fn stop(&self, name: impl Into<String>) -> Result<(), RuntimeError> {
        let name = name.into();
        Ok(self.request(|reply| Command::Stop { name, reply }).await??)
    }

    /// See [`Supervisor::restart`].
    pub async fn restart(&self, name: impl Into<String>) -> Result<(), RuntimeError> {
        let name = name.into();
        Ok(self
            .request(|reply| Command::Restart { name, reply })
            .await??)
    }

    /// See [`Supervisor::start_all`].
    pub async fn start_all(&self) -> Result<usize, RuntimeError> {
        self.request(|reply| Command::StartAll { reply }).await
    }

    /// See [`Supervisor::stop_all`].
    pub async fn stop_all(&self) -> Result<usize, RuntimeError> {
        self.request(|reply| Command::StopAll { reply }).await
    }

    /// See [`Supervisor::get_state`].
    pub async fn state(&self, name: impl Into<String>) -> Result<ServiceState, RuntimeError> {
        let name = name.into();
        Ok(self.request(|reply| Command::State { name, reply }).await??)
    }

    /// See [`Supervisor::is_healthy`].
    pub async fn is_healthy(&self, name: impl Into<String>) -> Result<bool, RuntimeError> {
        let name = name.into();
        self.request(|reply| Command::IsHealthy { name, reply })
            .await
    }

    /// See [`Supervisor::list`].
    pub async fn list(&self) -> Result<Vec<String>, RuntimeError> {
        self.request(|reply| Command::List { reply }).await
    }

    /// See [`Supervisor::services`].
    pub async fn services(&self) -> Result<Vec<ServiceInfo>, RuntimeError> {
        self.request(|reply| Command::Services { reply }).await
    }

    /// Publishes `event` onto the bus; it is dispatched on the next cycle.
    ///
    /// Returns the assigned sequence number.
    pub async fn publish(&self, event: Event) -> Result<u64, RuntimeError> {
        Ok(self
            .request(|reply| Command::Publish {
                event,
                reply: Some(reply),
            })
            .await??)
    }

    /// Fire-and-forget publish without waiting (fails if the command queue is full).
    pub fn try_publish(&self, event: Event) -> Result<(), RuntimeError> {
        self.tx
            .try_send(Command::Publish { event, reply: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("command queue full, event dropped");
                    RuntimeError::Full
                }
                mpsc::error::TrySendError::Closed(_) => RuntimeError::Closed,
            })
    }

    /// See [`Bus::subscribe`](crate::Bus::subscribe).
    pub async fn subscribe(
        &self,
        filter: impl Into<EventFilter>,
        subscriber: Box<dyn Subscribe>,
    ) -> Result<SubscriptionId, RuntimeError> {
        let filter = filter.into();
        Ok(self
            .request(|reply| Command::Subscribe {
                filter,
                subscriber,
                reply,
            })
            .await??)
    }

    /// See [`Bus::unsubscribe`](crate::Bus::unsubscribe).
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), RuntimeError> {
        Ok(self
            .request(|reply| Command::Unsubscribe { id, reply })
            .await??)
    }
}

/// Owns a [`Supervisor`] and drives it from a tokio task.
pub struct Runtime {
    supervisor: Supervisor,
    tx: mpsc::Sender<Command>,
    rx: mpsc::Receiver<Command>,
}

impl Runtime {
    /// Wraps `supervisor`; the command channel depth comes from its config.
    pub fn new(supervisor: Supervisor) -> Self {
        let (tx, rx) = mpsc::channel(supervisor.config().command_capacity_clamped());
        Self { supervisor, tx, rx }
    }

    /// Returns a handle for sending commands.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Runs the loop until `token` is cancelled, then shuts the supervisor
    /// down and returns it.
    pub async fn run(self, token: CancellationToken) -> Supervisor {
        let Runtime {
            mut supervisor,
            tx,
            mut rx,
        } = self;
        // The runtime's own sender keeps `recv` from ever yielding `None`.
        let _tx = tx;

        let mut interval = time::interval(supervisor.config().tick_interval_clamped());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            services = supervisor.len(),
            tick = ?supervisor.config().tick_interval_clamped(),
            "supervisor runtime started"
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let (report, dispatched) = supervisor.cycle(clock());
                    trace!(?report, dispatched, "cycle");
                }
                Some(cmd) = rx.recv() => cmd.apply(&mut supervisor),
            }
        }

        rx.close();
        while let Ok(cmd) = rx.try_recv() {
            debug!("applying command queued before shutdown");
            cmd.apply(&mut supervisor);
        }
        supervisor.shutdown();
        info!("supervisor runtime stopped");
        supervisor
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    ///
    /// Fails only if the signal listeners cannot be registered.
    pub async fn run_until_signal(self) -> io::Result<Supervisor> {
        let mut signals = Signals::register()?;
        let token = CancellationToken::new();
        let trigger = token.clone();
        let waiter = tokio::spawn(async move {
            let signal = signals.recv().await;
            info!(signal, "shutdown signal received");
            trigger.cancel();
        });

        let supervisor = self.run(token).await;
        waiter.abort();
        Ok(supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ServiceError;
    use crate::events::{EventKind, Priority};
    use crate::services::ServiceFn;
    use crate::subscribers::SubscriberFn;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn spawn(sup: Supervisor) -> (SupervisorHandle, CancellationToken, tokio::task::JoinHandle<Supervisor>) {
        let runtime = Runtime::new(sup);
        let handle = runtime.handle();
        let token = CancellationToken::new();
        let join = tokio::spawn(runtime.run(token.clone()));
        (handle, token, join)
    }

    #[tokio::test(start_paused = true)]
    async fn commands_round_trip() {
        let (handle, token, join) = spawn(Supervisor::new(Config::default()));

        handle
            .register(ServiceSpec::new("c", ServiceFn::new().arc()))
            .await
            .unwrap();
        handle
            .register(ServiceSpec::new("a", ServiceFn::new().arc()).depends_on("c"))
            .await
            .unwrap();
        handle.start("a").await.unwrap();

        assert_eq!(handle.state("c").await.unwrap(), ServiceState::Running);
        assert!(handle.is_healthy("a").await.unwrap());
        assert_eq!(handle.list().await.unwrap(), ["c", "a"]);
        assert!(matches!(
            handle.start("ghost").await,
            Err(RuntimeError::Supervisor(SupervisorError::NotFound { .. }))
        ));
        assert_eq!(handle.stop_all().await.unwrap(), 2);

        token.cancel();
        let sup = join.await.unwrap();
        assert!(sup.is_empty());
    }

    fn journaled(name: &'static str, ok: bool, journal: &Arc<Mutex<Vec<&'static str>>>) -> ServiceFn {
        let journal = Arc::clone(journal);
        ServiceFn::new().on_start(move || {
            journal.lock().unwrap().push(name);
            if ok {
                Ok(())
            } else {
                Err(ServiceError::fail("down"))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn due_tick_runs_before_pending_commands() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut sup = Supervisor::new(Config::default());
        sup.register(
            ServiceSpec::builder("net")
                .auto_restart(Duration::ZERO, 1)
                .build_fn(journaled("net", false, &journal)),
        )
        .unwrap();
        for name in ["a", "b", "c"] {
            sup.register(ServiceSpec::new(name, journaled(name, true, &journal).arc()))
                .unwrap();
        }
        assert!(sup.start("net").is_err());
        journal.lock().unwrap().clear();

        let runtime = Runtime::new(sup);
        let handle = runtime.handle();
        let token = CancellationToken::new();
        let join = tokio::spawn(runtime.run(token.clone()));

        // All three commands are queued before the loop first runs.
        let (a, b, c) = tokio::join!(handle.start("a"), handle.start("b"), handle.start("c"));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let order = journal.lock().unwrap().clone();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "net");

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn handle_starts_use_the_loop_clock() {
        let (handle, token, join) = spawn(Supervisor::new(Config::default()));
        handle
            .register(ServiceSpec::new("ntp", ServiceFn::new().arc()))
            .await
            .unwrap();

        time::sleep(Duration::from_secs(60)).await;
        let before = clock();
        handle.start("ntp").await.unwrap();
        let started = handle.services().await.unwrap()[0].started_at.unwrap();
        assert!(started >= before);
        assert!(started <= clock());

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_drive_auto_restart() {
        let (handle, token, join) = spawn(Supervisor::new(Config::default()));

        let net = ServiceSpec::builder("net")
            .auto_restart(Duration::from_millis(1000), 3)
            .build_fn(ServiceFn::new().on_start(|| Err(ServiceError::fail("no link"))));
        handle.register(net).await.unwrap();
        assert!(handle.start("net").await.is_err());

        time::sleep(Duration::from_secs(10)).await;
        let info = handle.services().await.unwrap().remove(0);
        assert_eq!(info.restart_count, 3);
        assert_eq!(info.state, ServiceState::Failed);

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn published_events_are_dispatched_by_the_loop() {
        let (handle, token, join) = spawn(Supervisor::new(Config::default()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handle
            .subscribe(
                EventKind::ConfigChanged,
                SubscriberFn::boxed("cfg", move |ev: &Event| sink.lock().unwrap().push(ev.seq)),
            )
            .await
            .unwrap();

        let seq = handle
            .publish(
                Event::new(EventKind::ConfigChanged)
                    .with_priority(Priority::High)
                    .with_source("test"),
            )
            .await
            .unwrap();
        handle
            .try_publish(Event::new(EventKind::SystemReboot))
            .unwrap();

        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*seen.lock().unwrap(), [seq]);

        token.cancel();
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn handle_is_closed_after_run() {
        let (handle, token, join) = spawn(Supervisor::new(Config::default()));
        token.cancel();
        join.await.unwrap();

        assert!(matches!(handle.list().await, Err(RuntimeError::Closed)));
        assert!(matches!(
            handle.try_publish(Event::new(EventKind::Custom)),
            Err(RuntimeError::Closed)
        ));
    }
}
