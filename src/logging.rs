//! Tracing setup.
//!
//! The interactive board owns the terminal, so it logs to a daily-rolling
//! file under the log directory. Every other command logs to stderr.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSection;

pub const LOG_FILE_PREFIX: &str = "quadrant.log";

#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    Stderr,
    /// Daily-rolling files in this directory.
    Dir(&'a Path),
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &LogSection, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LogSection, verbose: bool, target: LogTarget<'_>) -> Result<WorkerGuard> {
    let (writer, guard) = match target {
        LogTarget::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogTarget::Dir(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
        }
    };
    let ansi = matches!(target, LogTarget::Stderr) && console::colors_enabled_stderr();

    let human = (!config.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer.clone())
    });
    let json = config.json.then(|| fmt::layer().json().with_writer(writer));

    tracing_subscriber::registry()
        .with(env_filter(&default_directive(config, verbose)))
        .with(human)
        .with(json)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_forces_debug() {
        let config = LogSection {
            level: "warn".into(),
            ..Default::default()
        };
        assert_eq!(default_directive(&config, false), "warn");
        assert_eq!(default_directive(&config, true), "debug");
    }

    #[test]
    fn test_invalid_directive_falls_back() {
        // Does not panic on garbage.
        let _ = env_filter("quadrant=[[[");
    }
}
