//! Testing utilities for actionflow pipelines.
//!
//! This module provides:
//! - An event log shared by hosts and operations to check ordering
//! - A recording host with configurable hook behavior
//! - Operation builders that record, fail or stall

mod host;
mod operations;

pub use host::{RecordingHost, RecordingHostBuilder};
pub use operations::{failing_operation, recording_operation, slow_operation, EventLog};
