//! Tracing subscriber for training runs.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::TrainError;

/// Install a global subscriber logging to the console and, without ANSI
/// colours, to `log_path` (appended). `RUST_LOG` overrides the default
/// `info` filter. Fails if a global subscriber is already set.
pub fn init_tracing(log_path: &Path) -> Result<(), TrainError> {
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .map_err(|e| TrainError::Telemetry {
            reason: e.to_string(),
        })
}
