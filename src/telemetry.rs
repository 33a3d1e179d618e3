//! Tracing infrastructure.
//!
//! Structured, async-aware logging built on `tracing` and
//! `tracing-subscriber`:
//! - Structured events with fields (pin numbers, capture paths, step counts)
//! - Environment-based filtering via `RUST_LOG`
//! - Pretty or compact output formats
//!
//! # Example
//! ```no_run
//! use lumascope::{config::RigConfig, telemetry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RigConfig::load()?;
//! telemetry::init_from_config(&config)?;
//! tracing::info!("rig started");
//! # Ok(())
//! # }
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::RigConfig;

/// Output format for tracing.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development).
    Pretty,
    /// Compact format without colors (for unattended runs).
    Compact,
}

/// Tracing configuration options.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Level,
    /// Output format.
    pub format: OutputFormat,
    /// Whether to enable ANSI colors.
    pub with_ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create telemetry config with a custom level.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Parse a log level string from configuration.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!("Unknown log level: '{other}'")),
    }
}

/// Initialize tracing from the rig configuration.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_from_config(config: &RigConfig) -> Result<(), String> {
    let level = parse_log_level(&config.application.log_level)?;
    init(&TelemetryConfig::new(level))
}

/// Initialize the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_ansi(config.with_ansi)
        .with_target(false);

    let result = match config.format {
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|err| format!("Failed to install tracing subscriber: {err}"))
}
