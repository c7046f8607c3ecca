//! # Service abstractions and specifications.
//!
//! This module provides the service-related types:
//! - [`Service`] - trait with start/stop/health callbacks
//! - [`ServiceFn`] - closure-based service implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceSpec`] - specification bundling a service with its dependencies and policies
//! - [`ServiceSpecBuilder`] - fluent construction of a [`ServiceSpec`]

mod service;
mod service_fn;
mod spec;
mod spec_builder;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
pub use spec::ServiceSpec;
pub use spec_builder::ServiceSpecBuilder;
