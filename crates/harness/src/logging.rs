//! Logging initialization for binaries
//!
//! Installs a console layer (level from `RUST_LOG`, default info) and a file
//! layer appending everything at debug to `logs/tests.log`. Library code only
//! emits `tracing` events and never installs a subscriber, so components stay
//! testable without a console or filesystem.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::HarnessResult;

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "tests.log";

/// Install the console + file subscriber. Call once, from a binary.
pub fn init(log_dir: &Path) -> HarnessResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;

    let console = fmt::layer().with_target(false).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    let logfile = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console)
        .with(logfile)
        .init();

    Ok(())
}
