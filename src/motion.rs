//! Stepper motor phase sequencing.
//!
//! The sample rotator is a 4-phase unipolar stepper driven with the
//! half-step cycle: 8 patterns of 4 phase levels, giving twice the angular
//! resolution of full stepping. One full revolution of the output shaft is
//! 2048 half-steps on this gearbox.
//!
//! [`advance`] is the pure sequencing function; [`StepSequencer`] holds the
//! persistent step position and applies patterns to the actuator bank with
//! the configured inter-step delay. The sequencer never touches the actuator
//! lock itself - the caller locks once for the whole motion request, so a
//! move is atomic with respect to every other actuator operation.

use anyhow::Result;
use std::time::Duration;

use crate::hardware::capabilities::{Actuators, NUM_PHASES};
use crate::shutdown::ShutdownSignal;

/// Length of the half-step cycle.
pub const SEQUENCE_LEN: usize = 8;

/// Half-steps for one full revolution of the output shaft.
pub const STEPS_PER_REV: u32 = 2048;

/// One phase-level vector applied to the four motor pins.
pub type PhaseVector = [bool; NUM_PHASES];

/// The half-step cycle. Exactly 8 entries; index arithmetic wraps modulo 8.
pub const HALF_STEP_PATTERN: [PhaseVector; SEQUENCE_LEN] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// Rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Clockwise, walking the half-step cycle forwards.
    Forward,
    /// Counterclockwise, walking the cycle backwards.
    Reverse,
}

impl Direction {
    /// Signed step increment for this direction.
    pub fn delta(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// One motor command: step count plus direction.
///
/// Created per command, consumed synchronously, discarded after completion.
#[derive(Debug, Clone, Copy)]
pub struct MotionRequest {
    /// Number of half-steps to issue. Zero is a no-op.
    pub steps: u32,
    /// Rotation direction.
    pub direction: Direction,
}

impl MotionRequest {
    /// A full revolution in the given direction.
    pub fn full_revolution(steps_per_rev: u32, direction: Direction) -> Self {
        Self {
            steps: steps_per_rev,
            direction,
        }
    }
}

/// How a motion request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// All requested steps were issued.
    Completed {
        /// Steps issued.
        steps: u32,
    },
    /// Shutdown was requested mid-motion; the move stopped between steps.
    Cancelled {
        /// Steps issued before stopping.
        steps_done: u32,
    },
}

/// Compute the cycle index and phase vector for a step ordinal.
///
/// Forward motion visits `step mod 8`; reverse motion visits
/// `(-step) mod 8` normalized to `[0, 8)`. The two directions produce index
/// sequences that are exact reverses of one another over a full cycle.
pub fn advance(step: u64, direction: Direction) -> (usize, PhaseVector) {
    let index = match direction {
        Direction::Forward => (step % SEQUENCE_LEN as u64) as usize,
        Direction::Reverse => (-(step as i64)).rem_euclid(SEQUENCE_LEN as i64) as usize,
    };
    (index, HALF_STEP_PATTERN[index])
}

/// Phase sequencer with persistent step position.
///
/// The position survives across motion requests, so `move(8, Forward)`
/// followed by `move(8, Reverse)` returns the phase pins to the exact vector
/// they held before the pair.
#[derive(Debug)]
pub struct StepSequencer {
    position: i64,
    step_delay: Duration,
}

impl StepSequencer {
    /// Create a sequencer at position zero.
    pub fn new(step_delay: Duration) -> Self {
        Self {
            position: 0,
            step_delay,
        }
    }

    /// Current step position (signed; forward steps increment it).
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Cycle index the pins currently hold.
    pub fn index(&self) -> usize {
        self.position.rem_euclid(SEQUENCE_LEN as i64) as usize
    }

    /// Issue a motion request against the actuator bank.
    ///
    /// Applies one phase vector per step, suspending for the inter-step
    /// delay between advances. The shutdown signal is checked at every
    /// suspension point; a cancelled move stops between steps and reports
    /// how far it got. Pin-write failures abort the move.
    pub async fn move_motor(
        &mut self,
        actuators: &mut dyn Actuators,
        request: MotionRequest,
        signal: &mut ShutdownSignal,
    ) -> Result<MotionOutcome> {
        if signal.is_shutdown() {
            return Ok(MotionOutcome::Cancelled { steps_done: 0 });
        }

        for done in 0..request.steps {
            self.position += request.direction.delta();
            let vector = HALF_STEP_PATTERN[self.index()];
            for (phase, &level) in vector.iter().enumerate() {
                actuators.set_phase(phase, level).await?;
            }

            if signal.sleep(self.step_delay).await {
                tracing::debug!(
                    steps_done = done + 1,
                    requested = request.steps,
                    "Motion cancelled by shutdown"
                );
                return Ok(MotionOutcome::Cancelled {
                    steps_done: done + 1,
                });
            }
        }

        Ok(MotionOutcome::Completed {
            steps: request.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockActuators;
    use crate::shutdown::ShutdownController;

    #[test]
    fn forward_advance_is_step_mod_8() {
        for step in 0..64u64 {
            let (index, vector) = advance(step, Direction::Forward);
            assert_eq!(index, (step % 8) as usize);
            assert_eq!(vector, HALF_STEP_PATTERN[index]);
        }
    }

    #[test]
    fn reverse_advance_is_negated_and_normalized() {
        for step in 0..64u64 {
            let (index, _) = advance(step, Direction::Reverse);
            let expected = ((-(step as i64)) % 8 + 8) % 8;
            assert_eq!(index, expected as usize);
        }
    }

    #[test]
    fn directions_mirror_around_the_cycle() {
        // Reverse visits the cycle entry that forward motion of the same
        // step count would undo: index_rev = (8 - index_fwd) mod 8.
        for step in 0..32u64 {
            let (forward, _) = advance(step, Direction::Forward);
            let (reverse, _) = advance(step, Direction::Reverse);
            assert_eq!(reverse, (SEQUENCE_LEN - forward) % SEQUENCE_LEN);
        }
    }

    #[test]
    fn pattern_entries_are_half_step_shaped() {
        // Adjacent entries differ in exactly one phase, wrapping circularly.
        for i in 0..SEQUENCE_LEN {
            let a = HALF_STEP_PATTERN[i];
            let b = HALF_STEP_PATTERN[(i + 1) % SEQUENCE_LEN];
            let diff = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
            assert_eq!(diff, 1, "entries {i} and {} differ by {diff}", (i + 1) % 8);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_steps_is_a_no_op() {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let (_controller, mut signal) = ShutdownController::new();
        let mut sequencer = StepSequencer::new(Duration::from_millis(1));

        let started = tokio::time::Instant::now();
        let outcome = sequencer
            .move_motor(
                &mut actuators,
                MotionRequest {
                    steps: 0,
                    direction: Direction::Forward,
                },
                &mut signal,
            )
            .await
            .unwrap();

        assert_eq!(outcome, MotionOutcome::Completed { steps: 0 });
        assert!(probe.writes().is_empty());
        assert_eq!(tokio::time::Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn move_applies_four_writes_per_step() {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let (_controller, mut signal) = ShutdownController::new();
        let mut sequencer = StepSequencer::new(Duration::from_millis(1));

        sequencer
            .move_motor(
                &mut actuators,
                MotionRequest {
                    steps: 5,
                    direction: Direction::Forward,
                },
                &mut signal,
            )
            .await
            .unwrap();

        assert_eq!(probe.phase_write_count(), 5 * NUM_PHASES);
    }

    #[tokio::test(start_paused = true)]
    async fn forward_then_reverse_restores_phase_vector() {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let (_controller, mut signal) = ShutdownController::new();
        let mut sequencer = StepSequencer::new(Duration::from_millis(1));

        // Establish a known vector first.
        sequencer
            .move_motor(
                &mut actuators,
                MotionRequest {
                    steps: 3,
                    direction: Direction::Forward,
                },
                &mut signal,
            )
            .await
            .unwrap();
        let before = probe.phases();
        let position_before = sequencer.position();

        for direction in [Direction::Forward, Direction::Reverse] {
            sequencer
                .move_motor(
                    &mut actuators,
                    MotionRequest {
                        steps: 8,
                        direction,
                    },
                    &mut signal,
                )
                .await
                .unwrap();
        }

        assert_eq!(probe.phases(), before);
        assert_eq!(sequencer.position(), position_before);
    }

    #[tokio::test(start_paused = true)]
    async fn full_revolution_walks_256_cycles() {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let (_controller, mut signal) = ShutdownController::new();
        let mut sequencer = StepSequencer::new(Duration::from_micros(1500));

        let outcome = sequencer
            .move_motor(
                &mut actuators,
                MotionRequest::full_revolution(STEPS_PER_REV, Direction::Forward),
                &mut signal,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            MotionOutcome::Completed {
                steps: STEPS_PER_REV
            }
        );
        assert_eq!(probe.phase_write_count(), STEPS_PER_REV as usize * 4);
        assert_eq!(sequencer.position(), STEPS_PER_REV as i64);
        assert_eq!(sequencer.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_between_steps() {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let (controller, mut signal) = ShutdownController::new();
        let mut sequencer = StepSequencer::new(Duration::from_millis(10));

        controller.request_shutdown();
        let outcome = sequencer
            .move_motor(
                &mut actuators,
                MotionRequest {
                    steps: 100,
                    direction: Direction::Forward,
                },
                &mut signal,
            )
            .await
            .unwrap();

        match outcome {
            MotionOutcome::Cancelled { steps_done } => assert!(steps_done <= 1),
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert!(probe.phase_write_count() <= NUM_PHASES);
    }
}
