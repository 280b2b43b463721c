//! Tracing subscriber setup for the simulator binary.
//!
//! Stdout always, filtered by `SimConfig::log_level`. A daily-rolling file is
//! added when `SimConfig::log_dir` is set; if the directory cannot be created
//! the simulator keeps running with stdout only.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::SimConfig;

const LOG_FILE_PREFIX: &str = "lexi-sim.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Non-blocking writer over a daily-rolling file in `dir`.
fn rolling_writer(dir: &Path) -> std::io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

pub fn init_tracing(config: &SimConfig) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file = config.log_dir.as_deref().and_then(|dir| match rolling_writer(dir) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("file logging disabled, cannot use {}: {err}", dir.display());
            None
        }
    });
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let Some(dir) = &config.log_dir {
        tracing::debug!(log_dir = %dir.display(), file = guard.is_some(), "tracing initialised");
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_writer_creates_directory() {
        let dir = std::env::temp_dir().join(format!("lexi-logs-{}", std::process::id()));
        let (_writer, guard) = rolling_writer(&dir).unwrap();
        assert!(dir.is_dir());
        drop(guard);
        std::fs::remove_dir_all(&dir).ok();
    }
}
