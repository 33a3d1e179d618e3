//! Custom error types for the application.
//!
//! This module defines the primary error type, `RigError`, for the whole
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes the rig can hit:
//!
//! - **`Config`**: wraps errors from the `figment` crate, typically file
//!   parsing or format issues in the configuration file.
//! - **`Configuration`**: semantic errors in the configuration, such as
//!   values that parse fine but are logically invalid (e.g. a phase pin that
//!   collides with the laser pin). These are caught during validation.
//! - **`Io`**: wraps standard `std::io::Error` for file and console I/O.
//! - **`Actuator`**: failures reported by the actuator backend (GPIO line
//!   request or pin write failed). These abort the current operation but
//!   must never take down the other task.
//! - **`Capture`**: the capture collaborator could not produce an image.
//!
//! By using `#[from]`, `RigError` can be seamlessly created from underlying
//! error types, simplifying error handling throughout the application with
//! the `?` operator.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type RigResult<T> = std::result::Result<T, RigError>;

/// Application-level error type for the imaging rig.
#[derive(Error, Debug)]
pub enum RigError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or console I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command input source could not be read.
    #[error("Command input error: {0}")]
    Input(String),

    /// The actuator backend reported a failure.
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// The capture collaborator could not produce an image.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// No output directory configured and no home directory to fall back to.
    #[error("No output directory available; set capture.output_dir")]
    NoOutputDir,

    /// The background capture task did not stop within the join timeout.
    #[error("Background capture task did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}

impl RigError {
    /// Classify an error from the actuator seam.
    ///
    /// The hardware capability traits report `anyhow::Error`; this folds the
    /// full context chain into an `Actuator` variant.
    pub fn actuator(err: anyhow::Error) -> Self {
        RigError::Actuator(format!("{err:#}"))
    }

    /// Classify an error from the capture collaborator.
    pub fn capture(err: anyhow::Error) -> Self {
        RigError::Capture(format!("{err:#}"))
    }

    /// Classify an error from the command input source.
    pub fn input(err: anyhow::Error) -> Self {
        RigError::Input(format!("{err:#}"))
    }
}
