//! Logging bootstrap.
//!
//! The library only emits `tracing` events; applications decide where they
//! go. [`init_tracing`] installs a `tracing-subscriber` registry filtered by
//! the `ACTIONFLOW_LOG` environment variable (default `info`).

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "ACTIONFLOW_LOG";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn try_init_tracing(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}

/// Installs the global subscriber, ignoring a subscriber that is already set.
pub fn init_tracing(format: LogFormat) {
    if let Err(e) = try_init_tracing(format) {
        tracing::debug!("Tracing already initialized: {}", e);
    }
}
