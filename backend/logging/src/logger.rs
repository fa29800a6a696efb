//! Structured Logger
//!
//! Wraps `tracing` to provide console output, an optional NDJSON rolling file,
//! and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global structured logger.
///
/// `RUST_LOG` wins over `level`. With `log_dir` set, a daily rolling file
/// `switchboard.log.YYYY-MM-DD` receives JSON lines. `json` switches the console
/// layer to JSON too. Returns `false` if a global subscriber was already set.
pub fn init_logger(log_dir: Option<&Path>, level: &str, json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "switchboard.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stdout));
    let console_plain = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_json)
        .with(console_plain)
        .with(file_layer)
        .try_init()
        .is_ok()
}
