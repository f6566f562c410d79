//! SERVO42D register map.
//!
//! Addresses and section references follow the MKS SERVO42D RS485 User
//! Manual V1.0.6.

/// Encoder value, signed 48-bit over 3 input registers (8.1.2)
pub const ENCODER_VALUE: u16 = 0x0031;
pub const ENCODER_VALUE_QUANTITY: u16 = 3;

/// EN pin status, 1 input register (8.1.7)
pub const EN_PIN_STATUS: u16 = 0x003A;

/// Motor shaft protection status, 1 input register (8.1.9)
pub const SHAFT_PROTECTION_STATUS: u16 = 0x003E;

/// Restart the controller, write 1 (8.2.4)
pub const RESTART: u16 = 0x0041;

/// Encoder calibration, write 1 with no load on the shaft (8.2.5)
pub const CALIBRATE: u16 = 0x0080;

/// Work mode (8.2.6)
pub const WORK_MODE: u16 = 0x0082;

/// Working current in mA (8.2.7)
pub const WORKING_CURRENT: u16 = 0x0083;

/// Microsteps per full step (8.2.9)
pub const MICROSTEPS: u16 = 0x0084;

/// EN pin mode (8.2.10)
pub const EN_PIN_MODE: u16 = 0x0085;

/// Release shaft protection, write 0 (8.2.13)
pub const CLEAR_PROTECTION: u16 = 0x0088;

/// Set current position as zero, write 1 (8.2.19)
pub const SET_ZERO: u16 = 0x0092;

/// Holding current percentage (8.2.8)
pub const HOLD_CURRENT: u16 = 0x009B;

/// Enable the motor in serial mode (8.2.20)
pub const SERIAL_ENABLE: u16 = 0x00F3;

/// Speed mode run: 2 registers (8.3.3.1)
pub const SPEED_MODE: u16 = 0x00F6;
pub const SPEED_MODE_QUANTITY: u16 = 2;

/// Relative move by pulses: 4 registers (8.3.4.1)
pub const RELATIVE_PULSES: u16 = 0x00FD;
pub const RELATIVE_PULSES_QUANTITY: u16 = 4;

/// All configuration parameters: 19 input registers (8.3.2)
pub const CONFIG_BLOCK: u16 = 0x1147;
pub const CONFIG_BLOCK_QUANTITY: u16 = 19;

/// Encoder units per shaft revolution
pub const ENCODER_UNITS_PER_REVOLUTION: f64 = 16384.0;

/// Working current limits for the 42D in mA
pub const MIN_WORKING_CURRENT_MA: u16 = 250;
pub const MAX_WORKING_CURRENT_MA: u16 = 3000;
