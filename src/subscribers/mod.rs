//! # Bus subscribers.
//!
//! This module provides the [`Subscribe`] trait and the built-in subscribers.
//!
//! ## Architecture
//! ```text
//! publish() ──► EventQueue ──► Bus::process()
//!                                  │  for each event, in priority order
//!                                  ├──► slot 0: Subscribe::on_event(&Event)  (if filter matches)
//!                                  ├──► slot 1: ...
//!                                  └──► slot N: LogWriter / SubscriberFn / custom
//! ```
//!
//! ## Built-ins
//! - [`SubscriberFn`] wraps a closure
//! - [`LogWriter`] writes events to `tracing`

mod log;
mod subscribe;

pub use log::LogWriter;
pub use subscribe::{Subscribe, SubscriberFn};
