//! Coordinator for the imaging rig.
//!
//! The [`Rig`] owns the pin assignment, the shared actuator state, and the
//! capture collaborator. It starts the scheduled-capture task once at
//! process start, runs the interactive console until the operator exits or
//! the process receives an interrupt, and on every exit path cancels the
//! background task, joins it with a timeout, and invokes
//! `Actuators::shutdown_all` exactly once.
//!
//! # Concurrency model
//!
//! All actuator writes go through one `tokio::sync::Mutex` around
//! [`RigShared`]. Operations are serialized as whole units: a motion request
//! or a full scheduled laser pulse is atomic with respect to every other
//! actuator operation. Manual commands therefore queue behind an in-flight
//! pulse rather than tearing it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::RigConfig;
use crate::console::{CommandSource, Console, ExitReason};
use crate::error::{RigError, RigResult};
use crate::hardware::capabilities::{Actuators, FrameCapture};
use crate::motion::StepSequencer;
use crate::scheduler::ScheduledCapture;
use crate::shutdown::{ShutdownController, ShutdownSignal};

/// How long to wait for the background task to stop during shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared actuator state, guarded by a single lock.
pub struct RigShared {
    /// The actuator bank. No ambient global; tasks reach it only through
    /// the lock.
    pub actuators: Box<dyn Actuators>,
    /// Persistent stepper position.
    pub sequencer: StepSequencer,
    /// Last committed laser state. Only ever equals the value set by the
    /// most recently completed operation.
    pub laser_on: bool,
}

impl RigShared {
    /// Drive the laser pin and commit the new state.
    pub async fn set_laser(&mut self, on: bool) -> anyhow::Result<()> {
        self.actuators.set_laser(on).await?;
        self.laser_on = on;
        Ok(())
    }
}

/// Handle to the shared actuator state.
pub type SharedRig = Arc<Mutex<RigShared>>;

/// The coordinator.
pub struct Rig {
    config: RigConfig,
    shared: SharedRig,
    camera: Arc<dyn FrameCapture>,
    controller: ShutdownController,
    signal: ShutdownSignal,
    output_dir: PathBuf,
    scheduler_handle: Option<JoinHandle<()>>,
}

impl Rig {
    /// Build a rig from configuration and the chosen hardware backends.
    pub fn new(
        config: RigConfig,
        actuators: Box<dyn Actuators>,
        camera: Arc<dyn FrameCapture>,
    ) -> RigResult<Self> {
        config.validate()?;
        let output_dir = config.resolved_output_dir()?;
        let (controller, signal) = ShutdownController::new();

        let shared = Arc::new(Mutex::new(RigShared {
            actuators,
            sequencer: StepSequencer::new(config.motion.step_delay),
            laser_on: false,
        }));

        Ok(Self {
            config,
            shared,
            camera,
            controller,
            signal,
            output_dir,
            scheduler_handle: None,
        })
    }

    /// Handle for requesting shutdown from outside the run loop.
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.controller.clone()
    }

    /// Shared actuator state (for operations outside the console, e.g.
    /// integration tests asserting on pin state).
    pub fn shared(&self) -> SharedRig {
        Arc::clone(&self.shared)
    }

    /// Run the rig until the operator exits or an interrupt arrives.
    ///
    /// The shutdown path (cancel, join, de-energize) runs unconditionally,
    /// whatever the run loop returned.
    pub async fn run(mut self, source: &mut dyn CommandSource) -> RigResult<()> {
        let run_result = self.run_inner(source).await;
        let shutdown_result = self.shutdown().await;
        run_result.and(shutdown_result)
    }

    async fn run_inner(&mut self, source: &mut dyn CommandSource) -> RigResult<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        self.shared
            .lock()
            .await
            .actuators
            .initialize()
            .await
            .map_err(RigError::actuator)?;

        if self.config.schedule.enabled {
            let scheduler = ScheduledCapture::new(
                Arc::clone(&self.shared),
                Arc::clone(&self.camera),
                self.output_dir.clone(),
                self.config.schedule.clone(),
                self.controller.signal(),
            );
            self.scheduler_handle = Some(tokio::spawn(scheduler.run()));
            tracing::info!("Scheduled capture task started");
        } else {
            tracing::info!("Scheduled capture task disabled");
        }

        let console = Console::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.camera),
            self.output_dir.clone(),
            self.config.capture.manual_prefix.clone(),
            self.config.motion.steps_per_rev,
            self.signal.clone(),
        );

        tokio::select! {
            result = console.run(source) => {
                match result? {
                    ExitReason::OperatorExit => tracing::info!("Operator exit"),
                    ExitReason::InputClosed => tracing::info!("Command input closed"),
                    ExitReason::Shutdown => tracing::info!("Console observed shutdown"),
                }
                Ok(())
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                Ok(())
            }
        }
    }

    /// The single shutdown path: cancel the background task, join it with a
    /// timeout, then de-energize and release every pin.
    async fn shutdown(&mut self) -> RigResult<()> {
        self.controller.request_shutdown();

        let mut first_error = None;
        if let Some(handle) = self.scheduler_handle.take() {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => tracing::debug!("Scheduled capture task joined"),
                Ok(Err(join_err)) => {
                    tracing::error!(error = %join_err, "Scheduled capture task panicked");
                }
                Err(_) => {
                    tracing::error!("Scheduled capture task did not stop in time");
                    first_error = Some(RigError::ShutdownTimeout(JOIN_TIMEOUT));
                }
            }
        }

        let shutdown_result = self.shared.lock().await.actuators.shutdown_all().await;
        if let Err(err) = shutdown_result {
            tracing::error!(error = %format!("{err:#}"), "Actuator shutdown failed");
            first_error.get_or_insert(RigError::actuator(err));
        } else {
            tracing::info!("Actuators de-energized and released");
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
