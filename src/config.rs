//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. A TOML file (`lumascope.toml` by default)
//! 2. Environment variables (prefixed with `LUMASCOPE_`, sections separated
//!    by double underscores, e.g. `LUMASCOPE_APPLICATION__LOG_LEVEL=debug`)
//!
//! Every field has a default matching the rig this controller was built for
//! (laser on BCM 18, motor phases on BCM 2/3/4/17, 2048 steps per
//! revolution), so an empty file is a valid configuration.
//!
//! # Example
//! ```no_run
//! use lumascope::config::RigConfig;
//!
//! # fn main() -> Result<(), lumascope::error::RigError> {
//! let config = RigConfig::load_from("lumascope.toml")?;
//! config.validate()?;
//! println!("Application: {}", config.application.name);
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RigError, RigResult};

/// Top-level rig configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RigConfig {
    /// Application settings.
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Physical pin assignment.
    #[serde(default)]
    pub pins: PinAssignment,
    /// Stepper motion parameters.
    #[serde(default)]
    pub motion: MotionConfig,
    /// Scheduled capture cycle timing.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Capture output settings.
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Immutable mapping of logical actuator roles to GPIO lines.
///
/// Set once at startup; never reconfigured at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinAssignment {
    /// GPIO character device to open.
    #[serde(default = "default_chip")]
    pub chip: String,
    /// Laser output line (BCM numbering).
    #[serde(default = "default_laser_pin")]
    pub laser: u32,
    /// The four motor phase lines, in phase order A-D.
    #[serde(default = "default_phase_pins")]
    pub phases: [u32; 4],
}

/// Stepper motion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Steps for one full revolution (`cw`/`ccw` commands).
    #[serde(default = "default_steps_per_rev")]
    pub steps_per_rev: u32,
    /// Delay between consecutive half-steps.
    #[serde(default = "default_step_delay", with = "humantime_serde")]
    pub step_delay: Duration,
}

/// Timing of the unattended capture cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Whether the background capture task runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Laser-on time before the exposure.
    #[serde(default = "default_warmup", with = "humantime_serde")]
    pub warmup: Duration,
    /// Laser-on time after the exposure.
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,
    /// Idle time between capture cycles.
    #[serde(default = "default_idle_wait", with = "humantime_serde")]
    pub idle_wait: Duration,
}

/// Capture output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory where images are written. Falls back to `$HOME/Desktop`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// File-name prefix for manual captures.
    #[serde(default = "default_manual_prefix")]
    pub manual_prefix: String,
    /// External still-capture command. `{path}` is replaced with the target
    /// file. When unset, the stub camera is used (dry-run).
    #[serde(default)]
    pub camera_command: Option<String>,
}

fn default_app_name() -> String {
    "lumascope".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chip() -> String {
    "gpiochip0".to_string()
}

fn default_laser_pin() -> u32 {
    18
}

fn default_phase_pins() -> [u32; 4] {
    [2, 3, 4, 17]
}

fn default_steps_per_rev() -> u32 {
    2048
}

fn default_step_delay() -> Duration {
    Duration::from_micros(1500)
}

fn default_enabled() -> bool {
    true
}

fn default_warmup() -> Duration {
    Duration::from_secs(3)
}

fn default_cooldown() -> Duration {
    Duration::from_secs(2)
}

fn default_idle_wait() -> Duration {
    Duration::from_secs(180)
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            laser: default_laser_pin(),
            phases: default_phase_pins(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            steps_per_rev: default_steps_per_rev(),
            step_delay: default_step_delay(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            warmup: default_warmup(),
            cooldown: default_cooldown(),
            idle_wait: default_idle_wait(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            manual_prefix: default_manual_prefix(),
            camera_command: None,
        }
    }
}

impl RigConfig {
    /// Load configuration from the default file and environment variables.
    pub fn load() -> RigResult<Self> {
        Self::load_from("lumascope.toml")
    }

    /// Load configuration from a specific file path.
    ///
    /// Environment variables override file values with the `LUMASCOPE_`
    /// prefix, e.g. `LUMASCOPE_SCHEDULE__IDLE_WAIT=10m`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> RigResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LUMASCOPE_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> RigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(RigError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        // Laser and phase lines must all be distinct.
        let mut lines = self.pins.phases.to_vec();
        lines.push(self.pins.laser);
        lines.sort_unstable();
        lines.dedup();
        if lines.len() != 5 {
            return Err(RigError::Configuration(format!(
                "Pin assignment has duplicate lines: laser={} phases={:?}",
                self.pins.laser, self.pins.phases
            )));
        }

        if self.motion.steps_per_rev == 0 {
            return Err(RigError::Configuration(
                "motion.steps_per_rev must be positive".to_string(),
            ));
        }

        if self.motion.step_delay.is_zero() {
            return Err(RigError::Configuration(
                "motion.step_delay must be non-zero".to_string(),
            ));
        }

        if self.capture.manual_prefix.is_empty() {
            return Err(RigError::Configuration(
                "capture.manual_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the capture output directory.
    ///
    /// Resolved once at startup: the configured directory if set, otherwise
    /// `$HOME/Desktop` like the bench setup this rig replaces.
    pub fn resolved_output_dir(&self) -> RigResult<PathBuf> {
        if let Some(dir) = &self.capture.output_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join("Desktop"))
            .ok_or(RigError::NoOutputDir)
    }
}

fn default_manual_prefix() -> String {
    "manual_".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RigConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pins.laser, 18);
        assert_eq!(config.pins.phases, [2, 3, 4, 17]);
        assert_eq!(config.motion.steps_per_rev, 2048);
        assert_eq!(config.motion.step_delay, Duration::from_micros(1500));
        assert_eq!(config.schedule.idle_wait, Duration::from_secs(180));
        assert_eq!(config.capture.manual_prefix, "manual_");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = RigConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_pins() {
        let mut config = RigConfig::default();
        config.pins.laser = config.pins.phases[0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_step_delay() {
        let mut config = RigConfig::default();
        config.motion.step_delay = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_durations_from_toml() {
        let toml = r#"
            [schedule]
            warmup = "3s"
            cooldown = "2s"
            idle_wait = "3m"

            [motion]
            step_delay = "1500us"
        "#;
        let config: RigConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        assert_eq!(config.schedule.idle_wait, Duration::from_secs(180));
        assert_eq!(config.motion.step_delay, Duration::from_micros(1500));
    }

    #[test]
    fn schedule_round_trips_through_toml() {
        let text = toml::to_string(&ScheduleConfig::default()).unwrap();
        let parsed: ScheduleConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.warmup, Duration::from_secs(3));
        assert_eq!(parsed.cooldown, Duration::from_secs(2));
        assert_eq!(parsed.idle_wait, Duration::from_secs(180));
    }

    #[test]
    fn explicit_output_dir_wins() {
        let mut config = RigConfig::default();
        config.capture.output_dir = Some(PathBuf::from("/data/captures"));
        assert_eq!(
            config.resolved_output_dir().unwrap(),
            PathBuf::from("/data/captures")
        );
    }
}
