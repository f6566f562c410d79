//! # SERVO42D Bring-up
//!
//! Connects to an MKS SERVO42D over Modbus RTU, prepares it for angular
//! moves and prints what the controller reports about itself.

use anyhow::{Context, Result};
use tracing::{info, warn};

use servo42d_modbus::config::Config;
use servo42d_modbus::serial::RtuSerial;
use servo42d_modbus::servo::Servo42d;

/// Config file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Entry point for the bring-up tool
///
/// # Control Flow
///
/// 1. Set up logging and load the configuration
/// 2. Open the serial link and record the step parameters
/// 3. Run the setup routine when `[setup] run_on_start` is set
/// 4. Read encoder position, EN pin status and the configuration block
/// 5. Print the cached configuration as JSON
///
/// # Errors
///
/// Returns error if the configuration is invalid, no serial device can be
/// opened, or the controller stops answering.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=servo42d_modbus=debug cargo run --release -- config/default.toml
/// ```
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("SERVO42D bring-up v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    let setup_plan = config.setup_plan()?;

    let serial = RtuSerial::open(&config.serial.port, config.link_settings())?;
    info!("RS485 link open at {} ({} baud)", serial.device_path(), config.serial.baud_rate);

    let mut servo = Servo42d::new(serial, config.servo.slave_address);

    if !servo.set_step_parameters(config.servo.microsteps_per_step, config.servo.steps_per_revolution)? {
        warn!("Controller did not acknowledge step parameters; angular moves are unavailable");
    }

    if config.setup.run_on_start && !servo.setup_routine(&setup_plan)? {
        warn!("Setup routine finished with unacknowledged steps");
    }

    let encoder = servo.read_encoder_value().context("failed to read encoder")?;
    info!(
        "Encoder at {:.2} degrees ({} rotations + {:.2})",
        encoder.total_degrees, encoder.rotations, encoder.remaining_degrees
    );

    let enabled = servo.read_en_pin_status().context("failed to read EN pin status")?;
    info!("EN pin status: {}", if enabled { "enabled" } else { "disabled" });

    let configuration = servo
        .read_all_config_parameters()
        .context("failed to read configuration block")?;
    println!("{}", serde_json::to_string_pretty(configuration)?);

    Ok(())
}
