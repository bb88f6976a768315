use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "DROIDMON_LOG";

/// Where log lines may go for this run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogSink<'a> {
    File(&'a Path),
    Stderr,
    /// The terminal is owned by the live table; drop log output.
    Silent,
}

/// Install the global subscriber. `json` switches file output to one JSON
/// object per event, plus span-close events carrying capture timings.
pub fn init_tracing(level: &str, sink: LogSink<'_>, json: bool) -> Result<()> {
    let default_level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    match sink {
        LogSink::File(path) => {
            ensure_parent_dir(path)?;
            let file = File::create(path)?;
            let builder = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_env_filter(filter)
                .with_writer(Mutex::new(file));
            let installed = if json {
                builder
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .try_init()
            } else {
                builder.try_init()
            };
            installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
        }
        LogSink::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| eyre!("failed to set tracing subscriber: {e}")),
        LogSink::Silent => Ok(()),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
