//! GPIO actuator backend using the Linux character-device interface.
//!
//! Drives the laser pin and the four motor phase pins through `gpiod`
//! (`/dev/gpiochip*`). Line offsets come from the pin assignment in the
//! configuration and use BCM numbering on a Raspberry Pi.
//!
//! The laser and the phase bank are requested as two separate line groups so
//! each shows up with its own consumer label in the kernel's GPIO debug
//! output. Dropping the requests releases the lines; `shutdown_all` drives
//! everything low first so the hardware is de-energized regardless of what
//! the next consumer does.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use gpiod::{Chip, Lines, Options, Output};

use crate::config::PinAssignment;
use crate::hardware::capabilities::{Actuators, NUM_PHASES};

/// Real actuator bank over `gpiod`.
pub struct GpioActuators {
    pins: PinAssignment,
    chip: Chip,
    laser: Option<Lines<Output>>,
    phases: Option<Lines<Output>>,
    phase_levels: [bool; NUM_PHASES],
}

impl GpioActuators {
    /// Open the GPIO chip named in the pin assignment.
    ///
    /// Lines are not requested until [`Actuators::initialize`] runs.
    pub fn open(pins: PinAssignment) -> Result<Self> {
        let chip = Chip::new(&pins.chip)
            .with_context(|| format!("Failed to open GPIO chip '{}'", pins.chip))?;

        Ok(Self {
            pins,
            chip,
            laser: None,
            phases: None,
            phase_levels: [false; NUM_PHASES],
        })
    }

    fn write_phases(&mut self) -> Result<()> {
        let lines = self
            .phases
            .as_mut()
            .ok_or_else(|| anyhow!("phase lines not requested"))?;
        lines
            .set_values(self.phase_levels)
            .context("Failed to write motor phase lines")
    }
}

#[async_trait]
impl Actuators for GpioActuators {
    async fn initialize(&mut self) -> Result<()> {
        let laser_opts = Options::output([self.pins.laser])
            .values([false])
            .consumer("lumascope-laser");
        self.laser = Some(
            self.chip
                .request_lines(laser_opts)
                .with_context(|| format!("Failed to request laser line {}", self.pins.laser))?,
        );

        let phase_opts = Options::output(self.pins.phases)
            .values([false; NUM_PHASES])
            .consumer("lumascope-motor");
        self.phases = Some(
            self.chip
                .request_lines(phase_opts)
                .with_context(|| format!("Failed to request phase lines {:?}", self.pins.phases))?,
        );
        self.phase_levels = [false; NUM_PHASES];

        tracing::info!(
            chip = %self.pins.chip,
            laser = self.pins.laser,
            phases = ?self.pins.phases,
            "GPIO lines requested"
        );
        Ok(())
    }

    async fn set_laser(&mut self, on: bool) -> Result<()> {
        let lines = self
            .laser
            .as_mut()
            .ok_or_else(|| anyhow!("laser line not requested"))?;
        lines
            .set_values([on])
            .with_context(|| format!("Failed to set laser line to {on}"))
    }

    async fn set_phase(&mut self, phase: usize, level: bool) -> Result<()> {
        if phase >= NUM_PHASES {
            return Err(anyhow!("phase index {phase} out of range"));
        }
        self.phase_levels[phase] = level;
        self.write_phases()
    }

    async fn shutdown_all(&mut self) -> Result<()> {
        // Drive low before releasing so a dangling consumer cannot keep the
        // motor energized.
        if let Some(lines) = self.laser.as_mut() {
            if let Err(err) = lines.set_values([false]) {
                tracing::warn!(error = %err, "Failed to drive laser low during shutdown");
            }
        }
        if let Some(lines) = self.phases.as_mut() {
            if let Err(err) = lines.set_values([false; NUM_PHASES]) {
                tracing::warn!(error = %err, "Failed to drive phases low during shutdown");
            }
        }
        self.phase_levels = [false; NUM_PHASES];
        self.laser = None;
        self.phases = None;
        tracing::info!("GPIO lines released");
        Ok(())
    }
}
