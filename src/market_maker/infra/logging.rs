//! Structured logging bootstrap.
//!
//! Component-targeted `tracing` output with optional daily-rotated file
//! streams. Use the targets below for filtering:
//!
//! | Target | Description |
//! |--------|-------------|
//! | `basis_maker::core` | Engine lifecycle and tick loop |
//! | `basis_maker::estimator` | Fair price, volatility, momentum |
//! | `basis_maker::quoting` | Quote generation diagnostics |
//! | `basis_maker::execution` | Reconciliation and venue actions |
//! | `basis_maker::tracking` | Position and PnL ledgers |
//! | `basis_maker::risk` | Risk halts |
//!
//! ```bash
//! # Debug only the estimators
//! RUST_LOG=basis_maker::estimator=debug cargo run
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors (default for development)
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Directory for rotated log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Enable the daily-rotated file stream.
    #[serde(default)]
    pub enable_file: bool,

    /// Level for the file stream.
    #[serde(default = "default_file_level")]
    pub file_level: String,

    /// Enable stdout logging (default: true).
    #[serde(default = "default_enable_stdout")]
    pub enable_stdout: bool,

    /// Format for stdout logging.
    #[serde(default)]
    pub stdout_format: LogFormat,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_level() -> String {
    "info".to_string()
}

fn default_enable_stdout() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            enable_file: false,
            file_level: default_file_level(),
            enable_stdout: default_enable_stdout(),
            stdout_format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// Development config: pretty stdout, no files.
    pub fn development() -> Self {
        Self::default()
    }

    /// Production config: JSON stdout plus a rotated file stream.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_file: true,
            stdout_format: LogFormat::Json,
            ..Default::default()
        }
    }
}

/// Initialize the global subscriber.
///
/// The returned guards must stay alive for the life of the process or the
/// non-blocking file writer drops buffered lines.
pub fn init_logging(
    config: &LogConfig,
    env_filter_override: Option<&str>,
) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut guards = Vec::new();

    let base_filter = if let Some(filter) = env_filter_override {
        EnvFilter::new(filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = if config.enable_file {
        std::fs::create_dir_all(&config.log_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "maker.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        let filter = EnvFilter::new(&config.file_level);
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .with_filter(filter),
        )
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(file_layer);

    if config.enable_stdout {
        match config.stdout_format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_filter(base_filter))
                .init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_filter(base_filter))
                .init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().with_filter(base_filter))
                .init(),
        }
    } else {
        registry.init();
    }

    Ok(guards)
}
