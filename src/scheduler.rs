//! Unattended periodic-capture task.
//!
//! Cycles forever through warmup -> capture -> cooldown -> idle-wait until
//! shutdown is requested. The laser stays energized for the whole
//! warmup + capture + cooldown window, and the actuator lock is held for
//! that entire window so no manual command can interleave with the pulse.
//! The long idle wait runs without the lock, which keeps the console
//! responsive in steady state.
//!
//! Capture failures are logged and the cycle continues; a failure in one
//! cycle never takes the task down.

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::CaptureJob;
use crate::config::ScheduleConfig;
use crate::hardware::capabilities::FrameCapture;
use crate::rig::SharedRig;
use crate::shutdown::ShutdownSignal;

/// Current phase of the capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Laser energized, stabilizing before the exposure.
    WarmupLaser,
    /// Invoking the capture collaborator.
    Capture,
    /// Laser still energized after the exposure.
    CooldownLaser,
    /// Laser off, waiting for the next cycle.
    IdleWait,
}

/// The background capture task.
pub struct ScheduledCapture {
    shared: SharedRig,
    camera: Arc<dyn FrameCapture>,
    output_dir: PathBuf,
    timing: ScheduleConfig,
    signal: ShutdownSignal,
}

impl ScheduledCapture {
    /// Create the task. It does nothing until [`run`](Self::run) is awaited.
    pub fn new(
        shared: SharedRig,
        camera: Arc<dyn FrameCapture>,
        output_dir: PathBuf,
        timing: ScheduleConfig,
        signal: ShutdownSignal,
    ) -> Self {
        Self {
            shared,
            camera,
            output_dir,
            timing,
            signal,
        }
    }

    /// Run capture cycles until shutdown is requested.
    pub async fn run(mut self) {
        tracing::info!(
            warmup = ?self.timing.warmup,
            cooldown = ?self.timing.cooldown,
            idle_wait = ?self.timing.idle_wait,
            "Scheduled capture task running"
        );

        loop {
            match self.run_cycle().await {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(
                        error = %format!("{err:#}"),
                        "Scheduled cycle aborted; retrying after idle wait"
                    );
                    // Best effort: do not leave the laser energized behind a
                    // failed cycle.
                    let _ = self.shared.lock().await.set_laser(false).await;
                    if self.signal.sleep(self.timing.idle_wait).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduled capture task stopped");
    }

    /// One full cycle. Returns `Ok(true)` when shutdown was observed.
    async fn run_cycle(&mut self) -> anyhow::Result<bool> {
        {
            let mut rig = self.shared.lock().await;

            tracing::debug!(phase = ?CyclePhase::WarmupLaser, "Laser on");
            rig.set_laser(true).await?;
            if self.signal.sleep(self.timing.warmup).await {
                let _ = rig.set_laser(false).await;
                return Ok(true);
            }

            let job = CaptureJob::scheduled(&self.output_dir, Local::now());
            tracing::debug!(phase = ?CyclePhase::Capture, file = %job.file_name(), "Capturing");
            match self.camera.capture(&job.path).await {
                Ok(()) => tracing::info!(file = %job.file_name(), "Scheduled capture complete"),
                Err(err) => tracing::warn!(
                    error = %format!("{err:#}"),
                    file = %job.file_name(),
                    "Scheduled capture failed; cycle continues"
                ),
            }

            tracing::debug!(phase = ?CyclePhase::CooldownLaser, "Cooldown");
            if self.signal.sleep(self.timing.cooldown).await {
                let _ = rig.set_laser(false).await;
                return Ok(true);
            }
            rig.set_laser(false).await?;
        }

        tracing::debug!(phase = ?CyclePhase::IdleWait, "Idle");
        Ok(self.signal.sleep(self.timing.idle_wait).await)
    }
}
