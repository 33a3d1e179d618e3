//! Shutdown while a motor move is in flight: the move stops at a step
//! boundary, the background machinery is joined, and the pins are driven
//! low exactly once.

use std::sync::Arc;
use std::time::Duration;

use lumascope::config::RigConfig;
use lumascope::console::ScriptedSource;
use lumascope::hardware::mock::{MockActuators, MockCamera, PinWrite};
use lumascope::rig::Rig;
use tokio_test::assert_ok;

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_motion_at_step_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let (actuators, probe) = MockActuators::new();
    let camera = Arc::new(MockCamera::new());

    let mut config = RigConfig::default();
    config.capture.output_dir = Some(dir.path().to_path_buf());
    config.schedule.enabled = false;
    // Slow steps so the move is guaranteed to straddle the shutdown request.
    config.motion.step_delay = Duration::from_millis(50);

    let rig = Rig::new(config, Box::new(actuators), camera).unwrap();
    let controller = rig.shutdown_controller();

    // The script issues one rotation and then keeps the input open, so the
    // only way out is the shutdown request.
    let mut source = ScriptedSource::new(vec!["cw"]).blocking_when_empty();
    let runner = tokio::spawn(async move { rig.run(&mut source).await });

    // A few steps in (2048 * 50ms would be ~102s total).
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.request_shutdown();
    assert_ok!(runner.await.unwrap());

    let phase_writes = probe.phase_write_count();
    assert!(phase_writes > 0, "move never started");
    assert!(
        phase_writes < 2048 * 4,
        "move ran to completion despite shutdown"
    );
    // Writes per step come in complete groups of four.
    assert_eq!(phase_writes % 4, 0);

    // Single shutdown path: pins low, released once.
    assert_eq!(probe.shutdown_calls(), 1);
    assert_eq!(probe.writes().last(), Some(&PinWrite::AllLow));
    assert!(!probe.laser());
    assert_eq!(probe.phases(), [false; 4]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_console_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (actuators, probe) = MockActuators::new();
    let camera = Arc::new(MockCamera::new());

    let mut config = RigConfig::default();
    config.capture.output_dir = Some(dir.path().to_path_buf());
    config.schedule.enabled = false;

    let rig = Rig::new(config, Box::new(actuators), camera).unwrap();
    let controller = rig.shutdown_controller();

    let mut source = ScriptedSource::new(Vec::<String>::new()).blocking_when_empty();
    let runner = tokio::spawn(async move { rig.run(&mut source).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    controller.request_shutdown();
    runner.await.unwrap().unwrap();

    assert_eq!(probe.shutdown_calls(), 1);
    assert_eq!(probe.writes(), vec![PinWrite::AllLow]);
}
