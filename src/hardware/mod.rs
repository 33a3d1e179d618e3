//! Hardware backends and capability traits.
//!
//! - [`capabilities`] - the `Actuators` and `FrameCapture` traits the rest
//!   of the rig is written against
//! - [`gpio`] - real Linux GPIO backend (feature `gpio_hardware`)
//! - [`mock`] - recording mocks for tests and dry runs
//! - [`shell_camera`] - capture via an external still-capture command

pub mod capabilities;
#[cfg(feature = "gpio_hardware")]
pub mod gpio;
pub mod mock;
pub mod shell_camera;

pub use capabilities::{Actuators, FrameCapture, NUM_PHASES};
