//! # Serial Communication Module
//!
//! Handles the RS485 link to the SERVO42D controller.
//!
//! This module handles:
//! - Opening the serial port at 38,400 baud, 8N1
//! - Writing request frames
//! - Collecting the response until the slave falls silent or the timeout elapses

pub mod port_trait;

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Result, ServoError};
use crate::rtu::protocol::format_frame;
pub use port_trait::Transport;

/// Default baud rate of the SERVO42D Modbus interface
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// Default time to wait for the first response byte
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default silence that ends a response once bytes have arrived
pub const DEFAULT_FRAME_GAP: Duration = Duration::from_millis(20);

/// Default RS485 adapter paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-RS485 adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Serial link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub timeout: Duration,
    pub frame_gap: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            frame_gap: DEFAULT_FRAME_GAP,
        }
    }
}

/// Modbus RTU serial port
///
/// Blocking transport used by [`crate::servo::Servo42d`] on real hardware.
pub struct RtuSerial {
    /// Serial port handle
    port: Box<dyn tokio_serial::SerialPort>,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    /// Link timing
    settings: LinkSettings,
}

impl std::fmt::Debug for RtuSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtuSerial")
            .field("device_path", &self.device_path)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RtuSerial {
    /// Open the configured device, or auto-detect when `path` is empty
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use servo42d_modbus::serial::{LinkSettings, RtuSerial};
    ///
    /// let serial = RtuSerial::open("/dev/ttyUSB0", LinkSettings::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str, settings: LinkSettings) -> Result<Self> {
        if path.is_empty() {
            return Self::open_with_paths(DEFAULT_DEVICE_PATHS, settings);
        }

        let port = Self::open_port(path, &settings)?;
        info!("Opened Modbus RTU port {} at {} baud", path, settings.baud_rate);
        Ok(Self {
            port,
            device_path: path.to_string(),
            settings,
        })
    }

    /// Open the first device in `paths` that accepts the settings
    pub fn open_with_paths(paths: &[&str], settings: LinkSettings) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, &settings) {
                Ok(port) => {
                    info!("Successfully opened RS485 adapter at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                        settings,
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(ServoError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with Modbus RTU line settings (8N1)
    fn open_port(path: &str, settings: &LinkSettings) -> Result<Box<dyn tokio_serial::SerialPort>> {
        tokio_serial::new(path, settings.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| ServoError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Link timing in use
    pub fn settings(&self) -> LinkSettings {
        self.settings
    }

    /// Read until the response timeout passes with nothing received, or the
    /// line goes quiet for one frame gap after bytes have arrived
    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self.settings.timeout;
        let mut response = Vec::new();
        let mut chunk = [0u8; 64];

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let remaining = deadline - now;
            let wait = if response.is_empty() {
                remaining
            } else {
                remaining.min(self.settings.frame_gap)
            };
            self.port.set_timeout(wait).map_err(io::Error::from)?;

            match self.port.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => response.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(response)
    }
}

impl Transport for RtuSerial {
    fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>> {
        // Drop anything left over from an earlier, timed-out exchange
        self.port
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)?;

        self.port.write_all(frame)?;
        self.port.flush()?;
        debug!("Sent Modbus frame [{}]", format_frame(frame));

        let response = self.read_response()?;
        if response.is_empty() {
            debug!("No response within {:?}", self.settings.timeout);
        } else {
            debug!("Received Modbus frame [{}]", format_frame(&response));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_link_settings() {
        let settings = LinkSettings::default();
        assert_eq!(settings.baud_rate, 38_400);
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert!(settings.frame_gap < settings.timeout);
    }

    #[test]
    fn test_device_path_order() {
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyACM0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = RtuSerial::open_with_paths(invalid_paths, LinkSettings::default());

        match result {
            Err(ServoError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        match RtuSerial::open_with_paths(empty_paths, LinkSettings::default()) {
            Err(ServoError::SerialPortNotFound(_)) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_invalid_path_returns_serial_error() {
        match RtuSerial::open("/dev/nonexistent_serial_device_12345", LinkSettings::default()) {
            Err(ServoError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Only runs with a SERVO42D attached: cargo test -- --ignored
    #[test]
    #[ignore]
    fn test_encoder_read_with_real_hardware() {
        let mut serial = match RtuSerial::open("", LinkSettings::default()) {
            Ok(serial) => serial,
            Err(_) => {
                println!("No RS485 adapter detected (skipping)");
                return;
            }
        };

        let frame = crate::rtu::encoder::build_read_frame(
            1,
            crate::rtu::protocol::FunctionCode::ReadInputRegisters,
            0x0031,
            3,
        );
        let response = serial.send_and_receive(&frame).unwrap();
        println!("Encoder response from {}: [{}]", serial.device_path(), format_frame(&response));
    }
}
