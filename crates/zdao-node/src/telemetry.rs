//! Telemetry and logging initialization.
//!
//! Sets up structured logging with tracing, pretty or JSON, to stderr or a file.
//! Stdout is reserved for command output.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

// Flushes the file writer on exit; must live as long as the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize logging from configuration.
pub fn init_telemetry(config: &LoggingConfig) -> anyhow::Result<()> {
    match &config.file {
        Some(file) => init_telemetry_with_file(&config.level, config.json, file),
        None => init_console(&config.level, config.json),
    }
}

fn init_console(log_level: &str, json_format: bool) -> anyhow::Result<()> {
    console_subscriber(log_level, json_format, std::io::stderr)?.try_init()?;
    Ok(())
}

/// Compact or JSON subscriber writing every event to `writer`.
fn console_subscriber<W>(
    log_level: &str,
    json_format: bool,
    writer: W,
) -> anyhow::Result<impl tracing::Subscriber + Send + Sync + 'static>
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(log_level)?;
    let json = json_format.then(|| fmt::layer().json().with_writer(writer.clone()));
    let compact = (!json_format).then(|| fmt::layer().compact().with_writer(writer));

    Ok(tracing_subscriber::registry().with(filter).with(json).with(compact))
}

/// Initialize logging to an append-only file.
pub fn init_telemetry_with_file(log_level: &str, json_format: bool, log_file: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| anyhow::anyhow!("Failed to open log file '{}': {}", log_file.display(), e))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
    if json_format {
        tracing_subscriber::registry().with(filter).with(layer.json()).try_init()?;
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    }

    let _ = LOG_GUARD.set(guard);
    Ok(())
}
