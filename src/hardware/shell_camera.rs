//! Capture collaborator that shells out to an external still-capture tool.
//!
//! On the target rig the camera stack (ROI, exposure, format) is configured
//! entirely in the external tool's arguments, e.g.:
//!
//! ```toml
//! [capture]
//! camera_command = "rpicam-still --nopreview -o {path}"
//! ```
//!
//! `{path}` is replaced with the target file; if the placeholder is absent
//! the path is appended as a final argument.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::hardware::capabilities::FrameCapture;

/// Capture collaborator backed by an external command.
pub struct ShellCamera {
    command: String,
}

impl ShellCamera {
    /// Create a shell camera from the configured command line.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn command_line(&self, path: &Path) -> String {
        let path = path.display().to_string();
        if self.command.contains("{path}") {
            self.command.replace("{path}", &path)
        } else {
            format!("{} {}", self.command, path)
        }
    }
}

#[async_trait]
impl FrameCapture for ShellCamera {
    async fn capture(&self, path: &Path) -> Result<()> {
        let command_line = self.command_line(path);
        tracing::debug!(command = %command_line, "Invoking capture command");

        let status = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .status()
            .await
            .with_context(|| format!("Failed to spawn capture command '{command_line}'"))?;

        if !status.success() {
            return Err(anyhow!(
                "Capture command exited with {status}: '{command_line}'"
            ));
        }
        Ok(())
    }
}
