//! Multi-binary demo: a canned-output CLI and an HTTP server with graceful
//! shutdown.

pub mod build_info;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod routes;
pub mod shutdown;
pub mod timed_stream;

pub use build_info::BuildInfo;
pub use lifecycle::{LifecycleError, LifecycleState, ServerProcess, ServerTimeouts};
