//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`.
//! - [`metrics`]: request and error counters, exported at `/metrics`.

pub mod metrics;
pub mod tracing_layer;
