//! Logger module
//!
//! Two output streams:
//! - Diagnostics through `tracing` (stderr or `logging.error_log_file`)
//! - Access log lines through the access writer (stdout or
//!   `logging.access_log_file`)

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};

use crate::app::App;
use crate::config::{Config, LoggingConfig};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Initialize both log streams
///
/// Should be called once at application startup. `RUST_LOG` takes
/// precedence over `logging.level` when set and valid.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn Error>> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.is_empty());
    let (filter, rejected) = build_filter(env_directives.as_deref(), &config.level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.error_log_file.as_deref() {
        Some(path) => {
            let file = writer::open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| e as Box<dyn Error>)?;

    if let Some((directives, error)) = rejected {
        tracing::warn!(
            %directives,
            %error,
            level = %config.level,
            "ignoring invalid RUST_LOG, using logging.level"
        );
    }

    writer::init(config.access_log_file.as_deref())?;
    Ok(())
}

/// Pick the diagnostic filter.
///
/// Returns the `RUST_LOG` directives and their parse error alongside the
/// fallback filter when they were rejected.
fn build_filter(
    env_directives: Option<&str>,
    level: &str,
) -> Result<(EnvFilter, Option<(String, ParseError)>), ParseError> {
    let Some(directives) = env_directives else {
        return Ok((EnvFilter::try_new(level)?, None));
    };

    match EnvFilter::try_new(directives) {
        Ok(filter) => Ok((filter, None)),
        Err(error) => Ok((EnvFilter::try_new(level)?, Some((directives.to_string(), error)))),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, app: &App) {
    tracing::info!(
        app = app.name(),
        routes = app.routes().iter().count(),
        "listening on http://{addr}"
    );
    tracing::info!(level = %config.logging.level, "diagnostic logging");
    match config.server.workers {
        Some(workers) => tracing::info!(workers, "worker threads"),
        None => tracing::info!("worker threads: one per CPU core"),
    }
    if config.logging.access_log {
        tracing::info!(
            format = %config.logging.access_log_format,
            destination = config.logging.access_log_file.as_deref().unwrap_or("stdout"),
            "access log enabled"
        );
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!(max, "connection limit");
    }
}

pub fn log_connection_error(err: &hyper::Error) {
    if err.is_incomplete_message() {
        tracing::debug!(error = %err, "client closed connection mid-request");
    } else {
        tracing::warn!(error = %err, "failed to serve connection");
    }
}

/// Write a formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &AccessLogFormat) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_line(&line),
        None => println!("{line}"),
    }
}
