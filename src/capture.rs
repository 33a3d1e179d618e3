//! Capture jobs and output file naming.
//!
//! A [`CaptureJob`] is created immediately before invoking the capture
//! collaborator and has no further lifecycle once the collaborator returns.
//! Scheduled shots get a timestamp-derived name (`auto_<timestamp>.jpg`);
//! manual shots get a prefixed counter (`<prefix><n>.jpg`, counter starting
//! at 1 within one process run).

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Which task requested a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The unattended periodic-capture task.
    Scheduled,
    /// An operator `pic` command.
    Manual,
}

/// One capture request handed to the collaborator.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    /// Where the image artifact goes.
    pub path: PathBuf,
    /// Which task asked for it.
    pub trigger: TriggerSource,
}

impl CaptureJob {
    /// Job for a scheduled capture, named from the wall-clock timestamp.
    pub fn scheduled(output_dir: &Path, now: DateTime<Local>) -> Self {
        let name = format!("auto_{}.jpg", now.format("%Y-%m-%d_%H-%M-%S"));
        Self {
            path: output_dir.join(name),
            trigger: TriggerSource::Scheduled,
        }
    }

    /// Job for a manual capture, named from the per-run counter.
    pub fn manual(output_dir: &Path, prefix: &str, counter: u32) -> Self {
        Self {
            path: output_dir.join(format!("{prefix}{counter}.jpg")),
            trigger: TriggerSource::Manual,
        }
    }

    /// File name without the directory, for operator feedback.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
