//! Mock hardware implementations.
//!
//! Provides simulated devices for testing without physical hardware, and for
//! dry-running the rig on a development machine. The mock actuators record
//! every pin write in order, which is what the concurrency tests inspect to
//! check that operations from the two tasks never interleave.
//!
//! # Available mocks
//!
//! - `MockActuators` - records laser/phase writes, tracks current levels
//! - `MockCamera` - records capture requests and writes a stub file

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::hardware::capabilities::{Actuators, FrameCapture, NUM_PHASES};

/// One recorded write to the mock actuator bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    /// Laser pin driven to the given level.
    Laser(bool),
    /// One phase pin driven to the given level.
    Phase {
        /// Phase index, `0..4`.
        phase: usize,
        /// Level written.
        level: bool,
    },
    /// `shutdown_all` drove every output low.
    AllLow,
}

#[derive(Debug, Default)]
struct MockPinState {
    writes: Vec<PinWrite>,
    laser: bool,
    phases: [bool; NUM_PHASES],
    initialized: bool,
    shutdown_calls: u32,
}

/// Mock actuator bank recording every write.
///
/// Create with [`MockActuators::new`], which also returns a probe handle the
/// test keeps after the actuators are boxed into the rig.
#[derive(Debug)]
pub struct MockActuators {
    state: Arc<Mutex<MockPinState>>,
}

/// Test-side view into a [`MockActuators`] instance.
#[derive(Debug, Clone)]
pub struct ActuatorProbe {
    state: Arc<Mutex<MockPinState>>,
}

impl MockActuators {
    /// Create a mock actuator bank and its probe.
    pub fn new() -> (Self, ActuatorProbe) {
        let state = Arc::new(Mutex::new(MockPinState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            ActuatorProbe { state },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockPinState> {
        #[allow(clippy::unwrap_used)]
        self.state.lock().unwrap()
    }
}

impl ActuatorProbe {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockPinState> {
        #[allow(clippy::unwrap_used)]
        self.state.lock().unwrap()
    }

    /// Every write issued so far, in order.
    pub fn writes(&self) -> Vec<PinWrite> {
        self.lock().writes.clone()
    }

    /// Current laser level.
    pub fn laser(&self) -> bool {
        self.lock().laser
    }

    /// Current phase pin levels.
    pub fn phases(&self) -> [bool; NUM_PHASES] {
        self.lock().phases
    }

    /// How many times `shutdown_all` ran.
    pub fn shutdown_calls(&self) -> u32 {
        self.lock().shutdown_calls
    }

    /// Number of recorded phase writes.
    pub fn phase_write_count(&self) -> usize {
        self.lock()
            .writes
            .iter()
            .filter(|w| matches!(w, PinWrite::Phase { .. }))
            .count()
    }
}

#[async_trait]
impl Actuators for MockActuators {
    async fn initialize(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.laser = false;
        state.phases = [false; NUM_PHASES];
        state.initialized = true;
        tracing::debug!("MockActuators initialized");
        Ok(())
    }

    async fn set_laser(&mut self, on: bool) -> Result<()> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(anyhow!("mock actuators not initialized"));
        }
        state.laser = on;
        state.writes.push(PinWrite::Laser(on));
        Ok(())
    }

    async fn set_phase(&mut self, phase: usize, level: bool) -> Result<()> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(anyhow!("mock actuators not initialized"));
        }
        if phase >= NUM_PHASES {
            return Err(anyhow!("phase index {phase} out of range"));
        }
        state.phases[phase] = level;
        state.writes.push(PinWrite::Phase { phase, level });
        Ok(())
    }

    async fn shutdown_all(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.laser = false;
        state.phases = [false; NUM_PHASES];
        state.writes.push(PinWrite::AllLow);
        state.shutdown_calls += 1;
        state.initialized = false;
        tracing::debug!("MockActuators shut down");
        Ok(())
    }
}

// Stub JPEG header so captured files look like image artifacts.
const STUB_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// Mock capture collaborator.
///
/// Records every requested path and writes a stub file there. Can be told to
/// fail, for exercising the capture-failure policy of both tasks.
#[derive(Debug, Default)]
pub struct MockCamera {
    captures: Mutex<Vec<PathBuf>>,
    fail: AtomicBool,
    fail_once: AtomicBool,
}

impl MockCamera {
    /// Create a mock camera that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent captures fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Fail exactly the next capture, then succeed again.
    pub fn fail_next(&self) {
        self.fail_once.store(true, Ordering::SeqCst);
    }

    /// Paths of every capture requested so far, in order.
    pub fn captures(&self) -> Vec<PathBuf> {
        #[allow(clippy::unwrap_used)]
        self.captures.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameCapture for MockCamera {
    async fn capture(&self, path: &Path) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) || self.fail_once.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("mock camera failure"));
        }
        tokio::fs::write(path, STUB_JPEG).await?;
        #[allow(clippy::unwrap_used)]
        self.captures.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
