//! Hardware capability traits.
//!
//! The rig talks to physical hardware through two small capability traits
//! instead of one monolithic device interface:
//!
//! - `Actuators` - raw digital-output control of the laser pin and the four
//!   motor phase pins
//! - `FrameCapture` - the camera collaborator: given a file path, produce an
//!   image artifact
//!
//! Each capability trait:
//! - Is async (uses `#[async_trait]`)
//! - Uses `anyhow::Result` for errors
//! - Focuses on one thing
//!
//! Camera internals (ROI, exposure, resolution) are deliberately invisible
//! here; the rig only hands the collaborator a target path.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Number of motor phase outputs on a 4-phase unipolar stepper.
pub const NUM_PHASES: usize = 4;

/// Capability: discrete actuator outputs (laser + motor phases).
///
/// # Contract
/// - `initialize` configures every assigned pin as an output and drives the
///   laser and all phases low. Must be called before any other method.
/// - `set_phase` takes a phase index in `0..4`; out-of-range indices are a
///   programming error and return `Err`.
/// - `shutdown_all` drives every output low and releases the underlying
///   peripheral resource. It is invoked exactly once on every exit path and
///   must be safe to call after a partial initialization.
///
/// # Concurrency
/// Methods take `&mut self`: exclusive access is enforced by the single
/// actuator lock owned by the rig, not by each backend.
#[async_trait]
pub trait Actuators: Send {
    /// Configure all assigned pins as outputs, everything de-energized.
    async fn initialize(&mut self) -> Result<()>;

    /// Drive the laser pin high or low.
    async fn set_laser(&mut self, on: bool) -> Result<()>;

    /// Drive one motor phase pin high or low.
    async fn set_phase(&mut self, phase: usize, level: bool) -> Result<()>;

    /// Drive every output low and release the peripheral resource.
    async fn shutdown_all(&mut self) -> Result<()>;
}

/// Capability: still-image capture.
///
/// # Contract
/// - `capture` blocks until the collaborator has produced (or failed to
///   produce) the image at `path`.
/// - The parent directory is expected to exist; the rig resolves the output
///   directory once at startup.
#[async_trait]
pub trait FrameCapture: Send + Sync {
    /// Produce an image artifact at the given path.
    async fn capture(&self, path: &Path) -> Result<()>;
}
