//! # Lumascope Core Library
//!
//! Control library for a laser-illuminated sample-imaging rig: a laser
//! diode, a four-phase unipolar stepper motor rotating the sample stage,
//! and a camera. Two tasks share the actuators for the lifetime of the
//! process: a background task that periodically illuminates the sample and
//! captures a frame, and a foreground console that executes operator
//! commands.
//!
//! ## Crate Structure
//!
//! - **`capture`**: Capture jobs and output file naming for scheduled and
//!   manual shots.
//! - **`config`**: TOML + environment configuration (`config::RigConfig`)
//!   with pin assignments, motion timing, and the capture schedule.
//! - **`console`**: The interactive command task, its command grammar, and
//!   the `CommandSource` input abstraction.
//! - **`error`**: The crate-wide `RigError` enum and `RigResult` alias.
//! - **`hardware`**: Actuator and camera capability traits plus their
//!   backends (character-device GPIO, shell-command camera, mocks).
//! - **`motion`**: Half-step sequencing for the stepper and the
//!   cancellable `StepSequencer::move_motor` operation.
//! - **`rig`**: The `Rig` coordinator owning shared state, task startup,
//!   and the single shutdown path.
//! - **`scheduler`**: The unattended warmup/capture/cooldown/idle cycle.
//! - **`shutdown`**: Cooperative cancellation primitives shared by both
//!   tasks.
//! - **`telemetry`**: `tracing` subscriber setup.

pub mod capture;
pub mod config;
pub mod console;
pub mod error;
pub mod hardware;
pub mod motion;
pub mod rig;
pub mod scheduler;
pub mod shutdown;
pub mod telemetry;
