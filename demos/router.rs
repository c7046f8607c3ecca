//! # Example: router
//!
//! A small router control plane wired the way a firmware composition root does it.
//!
//! Shows how to:
//! - Describe services with dependencies and auto-restart policies.
//! - Attach the built-in [`LogWriter`] and a custom [`Subscribe`] implementation.
//! - Drive everything from [`Runtime`] and manage it through a [`SupervisorHandle`].
//!
//! ## Flow
//! ```text
//! net ◄── dhcp ◄──┐
//!  ▲              ├── web
//!  └──── dns ◄────┘
//! vpn (flaky: fails twice, auto-restarted every 500ms)
//!
//! Runtime::run(token)
//!   ├─► every 100ms: Supervisor::cycle(now) → tick + Bus::process
//!   └─► commands from the management task (start_all, publish, queries)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example router
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use svcvisor::{
    Config, Event, EventFilter, EventKind, LogWriter, Priority, Runtime, ServiceError, ServiceFn,
    ServiceSpec, Subscribe, Supervisor,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Counts crashes per service and prints a line for each.
#[derive(Default)]
struct CrashReporter {
    crashes: u32,
}

impl Subscribe for CrashReporter {
    fn on_event(&mut self, ev: &Event) {
        if ev.kind == EventKind::ServiceCrashed {
            self.crashes += 1;
            println!(
                "[crash-reporter] {} crashed (total crashes: {})",
                ev.payload_str().unwrap_or("<unknown>"),
                self.crashes
            );
        }
    }

    fn name(&self) -> &str {
        "crash-reporter"
    }
}

fn simple(name: &'static str) -> ServiceFn {
    ServiceFn::new()
        .on_start(move || {
            println!("[{name}] up");
            Ok(())
        })
        .on_stop(move || {
            println!("[{name}] down");
            Ok(())
        })
}

fn flaky_vpn() -> ServiceFn {
    let attempts = Arc::new(AtomicU32::new(0));
    ServiceFn::new().on_start(move || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= 2 {
            Err(ServiceError::fail(format!("handshake timeout (attempt {n})")))
        } else {
            println!("[vpn] tunnel established after {n} attempts");
            Ok(())
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        tick_interval: Duration::from_millis(100),
        callback_timeout: Duration::from_secs(2),
        ..Config::default()
    };

    let sup = Supervisor::builder(cfg)
        .with_subscriber(EventFilter::All, Box::new(LogWriter::new()))
        .with_subscriber(
            EventKind::ServiceCrashed,
            Box::new(CrashReporter::default()),
        )
        .with_service(ServiceSpec::new("net", simple("net").arc()))
        .with_service(ServiceSpec::new("dhcp", simple("dhcp").arc()).depends_on("net"))
        .with_service(ServiceSpec::new("dns", simple("dns").arc()).depends_on("net"))
        .with_service(
            ServiceSpec::new("web", simple("web").arc()).with_dependencies(["dhcp", "dns"]),
        )
        .with_service(
            ServiceSpec::builder("vpn")
                .depends_on("net")
                .auto_restart(Duration::from_millis(500), 5)
                .build_fn(flaky_vpn()),
        )
        .build()?;

    let runtime = Runtime::new(sup);
    let handle = runtime.handle();
    let token = CancellationToken::new();
    let driver = tokio::spawn(runtime.run(token.clone()));

    let started = handle.start_all().await?;
    println!("[main] start_all: {started} services started");

    handle
        .publish(
            Event::new(EventKind::ConfigChanged)
                .with_priority(Priority::High)
                .with_payload(b"wan.mtu=1492".to_vec())
                .with_source("config"),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(2)).await;

    for info in handle.services().await? {
        println!(
            "[main] {:<5} {:<10} restarts={}",
            info.name, info.state, info.restart_count
        );
    }

    token.cancel();
    let sup = driver.await?;
    println!("[main] shut down (registry empty: {})", sup.is_empty());
    Ok(())
}
