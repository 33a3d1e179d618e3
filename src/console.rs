//! Interactive operator console.
//!
//! Reads one command at a time and dispatches it synchronously: no new
//! command is accepted while a motor move or capture is in progress. The
//! input side is abstracted behind [`CommandSource`] so tests can feed
//! scripted command sequences instead of stdin.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::capture::CaptureJob;
use crate::error::{RigError, RigResult};
use crate::hardware::capabilities::FrameCapture;
use crate::motion::{Direction, MotionOutcome, MotionRequest};
use crate::rig::SharedRig;
use crate::shutdown::ShutdownSignal;

/// Menu printed when the console starts.
pub const MENU: &str = "\
Commands:
 - on / off   => Laser control
 - pic        => Take photo
 - cw / ccw   => Rotate motor clockwise / counterclockwise
 - exit       => Exit program";

/// One operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `on` - energize the laser.
    LaserOn,
    /// `off` - de-energize the laser.
    LaserOff,
    /// `pic` - manual capture with the per-run counter.
    TakePicture,
    /// `cw` - one full revolution forward.
    RotateClockwise,
    /// `ccw` - one full revolution reverse.
    RotateCounterclockwise,
    /// `exit` - leave the interactive loop.
    Exit,
}

impl Command {
    /// Parse an input line. Case-insensitive; surrounding whitespace is
    /// ignored. Returns `None` for anything unrecognized.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "on" => Some(Command::LaserOn),
            "off" => Some(Command::LaserOff),
            "pic" => Some(Command::TakePicture),
            "cw" => Some(Command::RotateClockwise),
            "ccw" => Some(Command::RotateCounterclockwise),
            "exit" => Some(Command::Exit),
            _ => None,
        }
    }
}

/// Source of operator command lines.
#[async_trait]
pub trait CommandSource: Send {
    /// Next input line, or `None` when the input is closed.
    async fn next_line(&mut self) -> Result<Option<String>>;
}

/// Command source reading lines from stdin.
pub struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinSource {
    /// Wrap the process stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for StdinSource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}

/// Scripted command source for tests.
///
/// Yields the queued lines in order; when exhausted it either reports the
/// input as closed or blocks forever (to keep a rig alive while a test
/// drives shutdown from outside).
pub struct ScriptedSource {
    lines: VecDeque<String>,
    block_when_empty: bool,
}

impl ScriptedSource {
    /// Source that yields the given lines and then reports end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            block_when_empty: false,
        }
    }

    /// After the script runs out, block instead of closing the input.
    pub fn blocking_when_empty(mut self) -> Self {
        self.block_when_empty = true;
        self
    }
}

#[async_trait]
impl CommandSource for ScriptedSource {
    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.block_when_empty => {
                futures::future::pending::<()>().await;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Why the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The operator entered `exit`.
    OperatorExit,
    /// The command input reached end of file.
    InputClosed,
    /// Shutdown was requested while the console was idle or mid-command.
    Shutdown,
}

/// The interactive command task.
pub struct Console {
    shared: SharedRig,
    camera: Arc<dyn FrameCapture>,
    output_dir: PathBuf,
    manual_prefix: String,
    steps_per_rev: u32,
    signal: ShutdownSignal,
    picture_counter: u32,
}

impl Console {
    /// Create the console task.
    pub fn new(
        shared: SharedRig,
        camera: Arc<dyn FrameCapture>,
        output_dir: PathBuf,
        manual_prefix: String,
        steps_per_rev: u32,
        signal: ShutdownSignal,
    ) -> Self {
        Self {
            shared,
            camera,
            output_dir,
            manual_prefix,
            steps_per_rev,
            signal,
            picture_counter: 1,
        }
    }

    /// Run the command loop until exit, end of input, or shutdown.
    pub async fn run(mut self, source: &mut dyn CommandSource) -> RigResult<ExitReason> {
        println!("{MENU}");

        loop {
            let line = tokio::select! {
                line = source.next_line() => line.map_err(RigError::input)?,
                _ = self.signal.requested() => return Ok(ExitReason::Shutdown),
            };

            let Some(line) = line else {
                return Ok(ExitReason::InputClosed);
            };
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Some(Command::Exit) => {
                    println!("Exiting program...");
                    return Ok(ExitReason::OperatorExit);
                }
                Some(command) => {
                    if let Some(reason) = self.dispatch(command).await {
                        return Ok(reason);
                    }
                }
                None => {
                    println!(
                        "Invalid command. Use 'on', 'off', 'pic', 'cw', 'ccw', or 'exit'."
                    );
                }
            }
        }
    }

    /// Dispatch one command. Returns `Some` when the loop should end
    /// (shutdown observed mid-command); `None` continues the loop. A failed
    /// command aborts that operation only.
    async fn dispatch(&mut self, command: Command) -> Option<ExitReason> {
        match command {
            Command::LaserOn => {
                self.set_laser(true).await;
                None
            }
            Command::LaserOff => {
                self.set_laser(false).await;
                None
            }
            Command::TakePicture => {
                self.take_picture().await;
                None
            }
            Command::RotateClockwise => {
                println!("Rotating clockwise...");
                self.rotate(Direction::Forward).await
            }
            Command::RotateCounterclockwise => {
                println!("Rotating counterclockwise...");
                self.rotate(Direction::Reverse).await
            }
            // Handled by the run loop before dispatch.
            Command::Exit => None,
        }
    }

    async fn set_laser(&mut self, on: bool) {
        let mut rig = self.shared.lock().await;
        match rig.set_laser(on).await {
            Ok(()) => println!("{}", if on { "LASER ON" } else { "LASER OFF" }),
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "Laser write failed");
                println!("Laser command failed: {err:#}");
            }
        }
    }

    async fn take_picture(&mut self) {
        let job = CaptureJob::manual(&self.output_dir, &self.manual_prefix, self.picture_counter);
        match self.camera.capture(&job.path).await {
            Ok(()) => {
                println!("Captured {}", job.file_name());
                self.picture_counter += 1;
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Manual capture failed");
                println!("Capture failed: {err:#}");
            }
        }
    }

    async fn rotate(&mut self, direction: Direction) -> Option<ExitReason> {
        let request = MotionRequest::full_revolution(self.steps_per_rev, direction);
        let outcome = {
            let mut rig = self.shared.lock().await;
            let crate::rig::RigShared {
                actuators,
                sequencer,
                ..
            } = &mut *rig;
            match sequencer
                .move_motor(actuators.as_mut(), request, &mut self.signal)
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "Motor write failed");
                    println!("Motor command failed: {err:#}");
                    return None;
                }
            }
        };

        match outcome {
            MotionOutcome::Completed { steps } => {
                tracing::info!(steps, ?direction, "Rotation complete");
                println!("Rotation complete.");
                None
            }
            MotionOutcome::Cancelled { steps_done } => {
                tracing::info!(steps_done, "Rotation interrupted by shutdown");
                Some(ExitReason::Shutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::capabilities::Actuators;
    use crate::hardware::mock::{MockActuators, MockCamera, PinWrite};
    use crate::motion::StepSequencer;
    use crate::rig::RigShared;
    use crate::shutdown::ShutdownController;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("on"), Some(Command::LaserOn));
        assert_eq!(Command::parse(" OFF "), Some(Command::LaserOff));
        assert_eq!(Command::parse("pic"), Some(Command::TakePicture));
        assert_eq!(Command::parse("cw"), Some(Command::RotateClockwise));
        assert_eq!(Command::parse("CCW"), Some(Command::RotateCounterclockwise));
        assert_eq!(Command::parse("exit"), Some(Command::Exit));
    }

    #[test]
    fn rejects_unknown_commands() {
        assert_eq!(Command::parse("fire"), None);
        assert_eq!(Command::parse("o n"), None);
    }

    struct Fixture {
        console: Console,
        source: ScriptedSource,
        probe: crate::hardware::mock::ActuatorProbe,
        camera: Arc<MockCamera>,
        dir: tempfile::TempDir,
        // Dropping the controller counts as shutdown; keep it alive.
        _controller: ShutdownController,
    }

    async fn console_with_mocks(commands: Vec<&str>) -> Fixture {
        let (mut actuators, probe) = MockActuators::new();
        actuators.initialize().await.unwrap();
        let shared = Arc::new(Mutex::new(RigShared {
            actuators: Box::new(actuators),
            sequencer: StepSequencer::new(Duration::from_millis(1)),
            laser_on: false,
        }));
        let camera = Arc::new(MockCamera::new());
        let dir = tempfile::tempdir().unwrap();
        let (controller, signal) = ShutdownController::new();

        let console = Console::new(
            shared,
            camera.clone(),
            dir.path().to_path_buf(),
            "manual_".to_string(),
            16,
            signal,
        );
        Fixture {
            console,
            source: ScriptedSource::new(commands),
            probe,
            camera,
            dir,
            _controller: controller,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn laser_commands_update_pin_and_state() {
        let mut fixture = console_with_mocks(vec!["on", "off", "exit"]).await;
        let reason = fixture.console.run(&mut fixture.source).await.unwrap();
        assert_eq!(reason, ExitReason::OperatorExit);
        assert_eq!(
            fixture.probe.writes(),
            vec![PinWrite::Laser(true), PinWrite::Laser(false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_captures_count_up_from_one() {
        let mut fixture = console_with_mocks(vec!["pic", "pic", "exit"]).await;
        fixture.console.run(&mut fixture.source).await.unwrap();
        assert_eq!(
            fixture.camera.captures(),
            vec![
                fixture.dir.path().join("manual_1.jpg"),
                fixture.dir.path().join("manual_2.jpg"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_capture_does_not_advance_counter() {
        let mut fixture = console_with_mocks(vec!["pic", "pic", "exit"]).await;
        fixture.camera.fail_next();
        fixture.console.run(&mut fixture.source).await.unwrap();
        // First `pic` failed, so the successful one still gets counter 1.
        assert_eq!(
            fixture.camera.captures(),
            vec![fixture.dir.path().join("manual_1.jpg")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_command_changes_nothing() {
        let mut fixture = console_with_mocks(vec!["blast", "exit"]).await;
        fixture.console.run(&mut fixture.source).await.unwrap();
        assert!(fixture.probe.writes().is_empty());
        assert!(fixture.camera.captures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_applies_full_revolution() {
        let mut fixture = console_with_mocks(vec!["cw", "exit"]).await;
        fixture.console.run(&mut fixture.source).await.unwrap();
        // steps_per_rev is 16 in the fixture; four pin writes per step.
        assert_eq!(fixture.probe.phase_write_count(), 16 * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_input_closes_console() {
        let mut fixture = console_with_mocks(vec!["on"]).await;
        let reason = fixture.console.run(&mut fixture.source).await.unwrap();
        assert_eq!(reason, ExitReason::InputClosed);
    }

    struct FailingSource;

    #[async_trait]
    impl CommandSource for FailingSource {
        async fn next_line(&mut self) -> Result<Option<String>> {
            Err(anyhow::anyhow!("tty gone"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn input_failure_surfaces_as_input_error() {
        let fixture = console_with_mocks(vec![]).await;
        let result = fixture.console.run(&mut FailingSource).await;
        assert!(matches!(result, Err(RigError::Input(_))));
    }
}
