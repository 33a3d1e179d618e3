//! CLI entry point for the lumascope imaging-rig controller.
//!
//! # Usage
//!
//! Run the rig (real GPIO backend, built with `--features gpio_hardware`):
//! ```bash
//! lumascope run --config lumascope.toml
//! ```
//!
//! Dry-run on a development machine with simulated hardware:
//! ```bash
//! lumascope run --mock --no-schedule
//! ```
//!
//! Validate a configuration file without touching hardware:
//! ```bash
//! lumascope check-config --config lumascope.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use lumascope::config::RigConfig;
use lumascope::console::StdinSource;
use lumascope::hardware::capabilities::{Actuators, FrameCapture};
use lumascope::hardware::mock::{MockActuators, MockCamera};
use lumascope::hardware::shell_camera::ShellCamera;
use lumascope::rig::Rig;
use lumascope::telemetry;

// Microsoft Rust Guidelines: M-MIMALLOC-APPS
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "lumascope")]
#[command(about = "Laser illumination and sample-rotation imaging rig", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rig: background capture schedule plus the operator console
    Run {
        /// Configuration file (defaults to lumascope.toml in the working
        /// directory; missing file means built-in defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Do not start the background capture schedule
        #[arg(long)]
        no_schedule: bool,

        /// Use simulated actuators instead of real GPIO lines
        #[arg(long)]
        mock: bool,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            no_schedule,
            mock,
        } => run_rig(config, no_schedule, mock).await,
        Commands::CheckConfig { config } => check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RigConfig> {
    Ok(match path {
        Some(path) => RigConfig::load_from(path)?,
        None => RigConfig::load()?,
    })
}

async fn run_rig(config_path: Option<PathBuf>, no_schedule: bool, mock: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    telemetry::init_from_config(&config).map_err(|err| anyhow::anyhow!(err))?;

    if no_schedule {
        config.schedule.enabled = false;
    }

    tracing::info!(
        name = %config.application.name,
        schedule = config.schedule.enabled,
        "Starting imaging rig"
    );

    let actuators = build_actuators(&config, mock)?;
    let camera = build_camera(&config);

    let rig = Rig::new(config, actuators, camera)?;
    let mut source = StdinSource::new();
    rig.run(&mut source).await?;

    tracing::info!("Imaging rig stopped");
    Ok(())
}

fn build_actuators(config: &RigConfig, mock: bool) -> Result<Box<dyn Actuators>> {
    if mock {
        tracing::info!("Using simulated actuators");
        let (actuators, _probe) = MockActuators::new();
        return Ok(Box::new(actuators));
    }

    #[cfg(feature = "gpio_hardware")]
    {
        let actuators = lumascope::hardware::gpio::GpioActuators::open(config.pins.clone())?;
        tracing::info!(chip = %config.pins.chip, "Opened GPIO actuators");
        Ok(Box::new(actuators))
    }

    #[cfg(not(feature = "gpio_hardware"))]
    {
        let _ = config;
        anyhow::bail!(
            "no GPIO backend compiled in; rebuild with --features gpio_hardware or pass --mock"
        )
    }
}

fn build_camera(config: &RigConfig) -> Arc<dyn FrameCapture> {
    match &config.capture.camera_command {
        Some(command) => Arc::new(ShellCamera::new(command.clone())),
        None => {
            tracing::warn!("No capture.camera_command configured; writing stub frames");
            Arc::new(MockCamera::new())
        }
    }
}

fn check_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    let output_dir = config.resolved_output_dir()?;

    println!("Configuration OK");
    println!("  chip:          {}", config.pins.chip);
    println!("  laser line:    {}", config.pins.laser);
    println!("  phase lines:   {:?}", config.pins.phases);
    println!("  steps/rev:     {}", config.motion.steps_per_rev);
    println!("  output dir:    {}", output_dir.display());
    println!(
        "  schedule:      {}",
        if config.schedule.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}
