//! Logger initialization.
//!
//! Installs the process-wide `env_logger` used by the demos and by callers that
//! want the engine's request and redirect tracing on their terminal.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (timestamp, colored level, target) and JSON lines for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter will override it.
///
/// # Arguments
///
/// * `level` - Minimum log level to display (overrides `RUST_LOG` if set)
/// * `format` - Log format (Plain or Json)
///
/// # Returns
///
/// `Ok(())` if initialization succeeds, or an error if logger setup fails.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if logger initialization fails.
///
/// # Examples
///
/// ```bash
/// # Use RUST_LOG for quick debugging
/// RUST_LOG=debug cargo run --example simple -- https://example.com
///
/// # Per-module filtering via RUST_LOG
/// RUST_LOG=httpx=debug,hyper=info cargo run --example proxies -- https://example.com
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    // Read from RUST_LOG environment variable first, then override with the given level
    let mut builder = env_logger::Builder::from_default_env();

    // The given level takes precedence over RUST_LOG
    builder.filter_level(level);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Warn);
    // SOCKS handshakes log every negotiation step at debug
    builder.filter_module("tokio_socks", LevelFilter::Warn);
    builder.filter_module("httpx", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
                writeln!(
                    buf,
                    "{}",
                    plain_line(&time, record.level(), record.target(), &record.args().to_string())
                )
            });
        }
    }

    // a second initialization is an error, not a panic
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

/// One plain log line: `time LEVEL target message`.
fn plain_line(time: &str, level: log::Level, target: &str, message: &str) -> String {
    let colored_level = match level {
        log::Level::Error => level.as_str().red(),
        log::Level::Warn => level.as_str().yellow(),
        log::Level::Info => level.as_str().green(),
        log::Level::Debug => level.as_str().blue(),
        log::Level::Trace => level.as_str().purple(),
    };
    format!("{} {} {} {}", time.dimmed(), colored_level, target.cyan(), message)
}
