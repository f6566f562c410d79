//! # SERVO42D Command Layer
//!
//! Maps motor operations onto Modbus registers of an MKS SERVO42D.
//!
//! This module handles:
//! - The four register primitives (0x03, 0x04, 0x06, 0x10)
//! - Setters judged by echo or acknowledgement frames
//! - Encoder, status and configuration reads
//! - The client-side configuration cache
//!
//! Every call is one synchronous request/response transaction. Nothing is
//! retried here; callers decide whether to repeat an operation.

pub mod configuration;
pub mod position;
pub mod registers;
pub mod types;

use std::io;

use bytes::{BufMut, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{Result, ServoError};
use crate::rtu::decoder::{decode_read_response, parse_int48};
use crate::rtu::encoder::*;
use crate::rtu::protocol::{format_frame, FunctionCode, MAX_READ_QUANTITY, MAX_WRITE_PAYLOAD};
use crate::serial::Transport;
use configuration::{ConfigurationBlock, DeviceConfiguration};
use position::{degrees_to_pulses, EncoderReading};
use registers::*;
use types::{Direction, EnableDisable, EnablePinMode, HoldCurrent, WorkMode};

/// A request frame and the raw bytes received for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub request: Vec<u8>,
    pub response: Vec<u8>,
}

impl Exchange {
    /// Whether the slave answered with the request verbatim
    pub fn is_echo(&self) -> bool {
        self.response == self.request
    }
}

/// Values applied by [`Servo42d::setup_routine`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupPlan {
    pub work_mode: WorkMode,
    pub working_current_ma: u16,
    pub hold_current: HoldCurrent,
    pub microsteps_per_step: u16,
    pub steps_per_revolution: u16,
}

impl Default for SetupPlan {
    fn default() -> Self {
        Self {
            work_mode: WorkMode::SrClose,
            working_current_ma: 1000,
            hold_current: HoldCurrent::Percent50,
            microsteps_per_step: 16,
            steps_per_revolution: 200,
        }
    }
}

fn validate_read_quantity(quantity: u16) -> Result<()> {
    if quantity == 0 || quantity > MAX_READ_QUANTITY {
        return Err(ServoError::Validation(format!(
            "register quantity must be between 1 and {}, got {}",
            MAX_READ_QUANTITY, quantity
        )));
    }
    Ok(())
}

fn no_response(what: &str) -> ServoError {
    ServoError::communication(
        what,
        io::Error::new(io::ErrorKind::TimedOut, "no response from slave"),
    )
}

/// Driver for one SERVO42D on a Modbus RTU link
///
/// # Examples
///
/// ```no_run
/// use servo42d_modbus::serial::{LinkSettings, RtuSerial};
/// use servo42d_modbus::servo::Servo42d;
/// use servo42d_modbus::servo::types::Direction;
///
/// let serial = RtuSerial::open("/dev/ttyUSB0", LinkSettings::default())?;
/// let mut servo = Servo42d::new(serial, 1);
///
/// servo.set_step_parameters(16, 200)?;
/// servo.relative_move_by_degrees(Direction::Cw, 100, 1000, 90.0)?;
/// # Ok::<(), servo42d_modbus::error::ServoError>(())
/// ```
#[derive(Debug)]
pub struct Servo42d<T: Transport> {
    transport: T,
    slave_address: u8,
    configuration: DeviceConfiguration,
}

impl<T: Transport> Servo42d<T> {
    /// Create a driver with an empty configuration cache. No I/O happens.
    pub fn new(transport: T, slave_address: u8) -> Self {
        Self {
            transport,
            slave_address,
            configuration: DeviceConfiguration::default(),
        }
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    /// Cached configuration
    pub fn configuration(&self) -> &DeviceConfiguration {
        &self.configuration
    }

    fn transact(&mut self, request: Vec<u8>, what: &str) -> Result<Exchange> {
        let response = self
            .transport
            .send_and_receive(&request)
            .map_err(|e| ServoError::communication(what, e))?;

        debug!(
            "{}: sent [{}] received [{}]",
            what,
            format_frame(&request),
            format_frame(&response)
        );

        Ok(Exchange { request, response })
    }

    // ---- Primitives --------------------------------------------------------

    /// Read holding registers (0x03)
    ///
    /// # Errors
    ///
    /// - [`ServoError::Validation`] if `quantity` is 0 or above 125
    /// - [`ServoError::Communication`] if the transport fails
    pub fn read_holding_registers(&mut self, slave: u8, start_address: u16, quantity: u16) -> Result<Exchange> {
        validate_read_quantity(quantity)?;
        let request = build_read_frame(slave, FunctionCode::ReadHoldingRegisters, start_address, quantity);
        self.transact(request, &format!("read holding registers 0x{:04X}", start_address))
    }

    /// Read input registers (0x04)
    ///
    /// # Errors
    ///
    /// Same as [`Self::read_holding_registers`].
    pub fn read_input_registers(&mut self, slave: u8, start_address: u16, quantity: u16) -> Result<Exchange> {
        validate_read_quantity(quantity)?;
        let request = build_read_frame(slave, FunctionCode::ReadInputRegisters, start_address, quantity);
        self.transact(request, &format!("read input registers 0x{:04X}", start_address))
    }

    /// Write a single register (0x06)
    pub fn write_single_register(&mut self, slave: u8, address: u16, value: u16) -> Result<Exchange> {
        let request = build_write_single_frame(slave, address, value);
        self.transact(request, &format!("write single register 0x{:04X}", address))
    }

    /// Write multiple registers (0x10)
    ///
    /// `payload` is sent as given; `register_quantity` and `byte_quantity`
    /// are not cross-checked against it.
    ///
    /// # Errors
    ///
    /// - [`ServoError::Validation`] if `payload` exceeds 246 bytes
    /// - [`ServoError::Communication`] if the transport fails
    pub fn write_multiple_registers(
        &mut self,
        slave: u8,
        start_address: u16,
        register_quantity: u16,
        byte_quantity: u8,
        payload: &[u8],
    ) -> Result<Exchange> {
        if payload.len() > MAX_WRITE_PAYLOAD {
            return Err(ServoError::Validation(format!(
                "payload must be at most {} bytes, got {}",
                MAX_WRITE_PAYLOAD,
                payload.len()
            )));
        }

        let request = build_write_multiple_frame(slave, start_address, register_quantity, byte_quantity, payload);
        self.transact(request, &format!("write multiple registers 0x{:04X}", start_address))
    }

    // ---- Echo-acknowledged setters -----------------------------------------

    /// Write one register and report whether the slave echoed the request
    fn write_echoed(&mut self, register: u16, value: u16, action: &str) -> Result<bool> {
        let exchange = self.write_single_register(self.slave_address, register, value)?;

        if exchange.is_echo() {
            info!("{}: done", action);
            Ok(true)
        } else {
            warn!("{}: no echo, got [{}]", action, format_frame(&exchange.response));
            Ok(false)
        }
    }

    /// Set the working current in mA (250 to 3000)
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::Validation`] outside 250..=3000 mA, before any I/O.
    pub fn set_working_current(&mut self, working_current_ma: u16) -> Result<bool> {
        if !(MIN_WORKING_CURRENT_MA..=MAX_WORKING_CURRENT_MA).contains(&working_current_ma) {
            return Err(ServoError::Validation(format!(
                "working current must be between {} and {} mA, got {}",
                MIN_WORKING_CURRENT_MA, MAX_WORKING_CURRENT_MA, working_current_ma
            )));
        }

        let ok = self.write_echoed(WORKING_CURRENT, working_current_ma, "set working current")?;
        if ok {
            self.configuration.working_current_ma = Some(working_current_ma);
        }
        Ok(ok)
    }

    /// Set the holding current as a share of the working current
    pub fn set_holding_current_percentage(&mut self, hold_current: HoldCurrent) -> Result<bool> {
        let ok = self.write_echoed(HOLD_CURRENT, hold_current.value(), "set holding current")?;
        if ok {
            self.configuration.hold_current = Some(hold_current);
        }
        Ok(ok)
    }

    /// Set microsteps per step and record the motor's steps per revolution
    ///
    /// Only `microsteps` is written to the controller. On success the cache
    /// gains `degrees_per_microstep`, which angular moves depend on.
    pub fn set_step_parameters(&mut self, microsteps: u16, steps_per_revolution: u16) -> Result<bool> {
        if microsteps == 0 || steps_per_revolution == 0 {
            return Err(ServoError::Validation(format!(
                "microsteps ({}) and steps per revolution ({}) must be non-zero",
                microsteps, steps_per_revolution
            )));
        }

        let ok = self.write_echoed(MICROSTEPS, microsteps, "set step parameters")?;
        if ok {
            self.configuration.set_step_parameters(microsteps, steps_per_revolution);
        }
        Ok(ok)
    }

    /// Calibrate the encoder. Run with no load on the shaft.
    pub fn calibrate(&mut self) -> Result<bool> {
        self.write_echoed(CALIBRATE, 1, "calibrate")
    }

    pub fn restart(&mut self) -> Result<bool> {
        self.write_echoed(RESTART, 1, "restart")
    }

    /// Make the current shaft position the zero point
    pub fn set_zero(&mut self) -> Result<bool> {
        self.write_echoed(SET_ZERO, 1, "set zero")
    }

    pub fn set_work_mode(&mut self, work_mode: WorkMode) -> Result<bool> {
        let ok = self.write_echoed(WORK_MODE, work_mode.value(), "set work mode")?;
        if ok {
            self.configuration.work_mode = Some(work_mode);
        }
        Ok(ok)
    }

    /// Release locked-rotor protection so the motor can run again
    pub fn clear_motor_protection(&mut self) -> Result<bool> {
        self.write_echoed(CLEAR_PROTECTION, 0, "clear motor protection")
    }

    /// Ignore the physical EN pin; the board is always active
    pub fn disable_enable_pin(&mut self) -> Result<bool> {
        self.write_echoed(EN_PIN_MODE, EnablePinMode::AlwaysActive.value(), "disable EN pin")
    }

    /// Enable or release the motor while in serial (`SR_*`) mode
    pub fn set_serial_mode_motor_enable(&mut self, state: EnableDisable) -> Result<bool> {
        self.write_echoed(SERIAL_ENABLE, state.value(), "set serial mode motor enable")
    }

    // ---- Motion ------------------------------------------------------------

    /// Move a number of microstep pulses relative to the current position
    ///
    /// Succeeds when the acknowledgement starts with
    /// `[slave, 0x10, 0x00, 0xFD, 0x00, 0x04]`.
    pub fn relative_move_by_pulses(
        &mut self,
        direction: Direction,
        acceleration: u8,
        speed: u16,
        pulses: u32,
    ) -> Result<bool> {
        let mut payload = BytesMut::with_capacity(8);
        payload.put_u8(direction.value());
        payload.put_u8(acceleration);
        payload.put_u16(speed);
        payload.put_u32(pulses);

        let exchange = self.write_multiple_registers(
            self.slave_address,
            RELATIVE_PULSES,
            RELATIVE_PULSES_QUANTITY,
            payload.len() as u8,
            &payload,
        )?;

        let [start_hi, start_lo] = RELATIVE_PULSES.to_be_bytes();
        let [qty_hi, qty_lo] = RELATIVE_PULSES_QUANTITY.to_be_bytes();
        let expected_header = [
            self.slave_address,
            FunctionCode::WriteMultipleRegisters.value(),
            start_hi,
            start_lo,
            qty_hi,
            qty_lo,
        ];

        if exchange.response.starts_with(&expected_header) {
            info!("Relative move of {} pulses {:?} accepted", pulses, direction);
            Ok(true)
        } else {
            warn!(
                "Relative move of {} pulses rejected, got [{}]",
                pulses,
                format_frame(&exchange.response)
            );
            Ok(false)
        }
    }

    /// Move by an angle, converted with the cached degrees per microstep
    ///
    /// # Errors
    ///
    /// - [`ServoError::ConfigurationDependency`] if step parameters were never set
    /// - [`ServoError::Validation`] if `degrees` is negative, not finite, or
    ///   needs more pulses than fit in 32 bits
    pub fn relative_move_by_degrees(
        &mut self,
        direction: Direction,
        acceleration: u8,
        speed: u16,
        degrees: f64,
    ) -> Result<bool> {
        let degrees_per_microstep = self.configuration.require_degrees_per_microstep()?;

        if !degrees.is_finite() || degrees < 0.0 {
            return Err(ServoError::Validation(format!(
                "degrees must be a finite, non-negative angle, got {}",
                degrees
            )));
        }

        let pulses = degrees_to_pulses(degrees, degrees_per_microstep);
        if pulses > f64::from(u32::MAX) {
            return Err(ServoError::Validation(format!(
                "{} degrees needs {} pulses, more than a single move allows",
                degrees, pulses
            )));
        }

        debug!("{} degrees -> {} pulses", degrees, pulses);
        self.relative_move_by_pulses(direction, acceleration, speed, pulses as u32)
    }

    /// Run continuously at `speed` until told otherwise
    ///
    /// Succeeds only on the exact acknowledgement frame
    /// `[slave, 0x10, 0x00, 0xF6, 0x00, 0x02, crc_lo, crc_hi]`.
    pub fn move_at_speed(&mut self, direction: Direction, acceleration: u8, speed: u16) -> Result<bool> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u8(direction.value());
        payload.put_u8(acceleration);
        payload.put_u16(speed);

        let exchange = self.write_multiple_registers(
            self.slave_address,
            SPEED_MODE,
            SPEED_MODE_QUANTITY,
            payload.len() as u8,
            &payload,
        )?;

        let expected = build_write_multiple_ack(self.slave_address, SPEED_MODE, SPEED_MODE_QUANTITY);
        if exchange.response == expected {
            info!("Speed mode {:?} at {} accepted", direction, speed);
            Ok(true)
        } else {
            warn!("Speed mode rejected, got [{}]", format_frame(&exchange.response));
            Ok(false)
        }
    }

    // ---- Reads -------------------------------------------------------------

    /// Read input registers of this slave and return the data bytes
    fn read_input_data(&mut self, start_address: u16, quantity: u16, what: &str) -> Result<Vec<u8>> {
        let exchange = self.read_input_registers(self.slave_address, start_address, quantity)?;
        if exchange.response.is_empty() {
            return Err(no_response(what));
        }

        decode_read_response(
            &exchange.response,
            self.slave_address,
            FunctionCode::ReadInputRegisters,
            quantity,
        )
    }

    /// Read the multi-turn encoder position
    ///
    /// # Errors
    ///
    /// - [`ServoError::Communication`] if nothing came back
    /// - [`ServoError::ProtocolMismatch`] if the response is malformed
    pub fn read_encoder_value(&mut self) -> Result<EncoderReading> {
        let data = self.read_input_data(ENCODER_VALUE, ENCODER_VALUE_QUANTITY, "read encoder value")?;
        let bytes = <[u8; 6]>::try_from(data.as_slice())
            .map_err(|_| ServoError::ProtocolMismatch(format!("Encoder value is {} bytes", data.len())))?;

        let reading = EncoderReading::from_count(parse_int48(bytes));
        debug!(
            "Encoder count {} = {:.3} degrees ({} rotations + {:.3})",
            reading.count, reading.total_degrees, reading.rotations, reading.remaining_degrees
        );
        Ok(reading)
    }

    /// Read a one-register status flag that must be exactly 0 or 1
    fn read_status_flag(&mut self, register: u16, what: &str) -> Result<bool> {
        let exchange = self.read_input_registers(self.slave_address, register, 1)?;

        let set = build_read_response(self.slave_address, FunctionCode::ReadInputRegisters, &[0x00, 0x01]);
        let clear = build_read_response(self.slave_address, FunctionCode::ReadInputRegisters, &[0x00, 0x00]);

        if exchange.response == set {
            Ok(true)
        } else if exchange.response == clear {
            Ok(false)
        } else if exchange.response.is_empty() {
            Err(no_response(what))
        } else {
            Err(ServoError::ProtocolMismatch(format!(
                "{}: unexpected response [{}]",
                what,
                format_frame(&exchange.response)
            )))
        }
    }

    /// Whether the EN pin currently enables the driver
    pub fn read_en_pin_status(&mut self) -> Result<bool> {
        self.read_status_flag(EN_PIN_STATUS, "read EN pin status")
    }

    /// Whether the motor shaft protection has tripped
    pub fn read_motor_shaft_protection_status(&mut self) -> Result<bool> {
        self.read_status_flag(SHAFT_PROTECTION_STATUS, "read shaft protection status")
    }

    /// Read every configuration parameter and refresh the cache
    ///
    /// The response must start with `[slave, 0x04, 0x26]` and carry a valid
    /// CRC. Unrecognized codes are kept as [`types::Decoded::Unknown`].
    pub fn read_all_config_parameters(&mut self) -> Result<&DeviceConfiguration> {
        let data = self.read_input_data(CONFIG_BLOCK, CONFIG_BLOCK_QUANTITY, "read configuration block")?;
        let block = ConfigurationBlock::decode(&data)?;

        debug!("Configuration block: {:?}", block);
        self.configuration.apply_block(block);
        Ok(&self.configuration)
    }

    // ---- Bring-up ----------------------------------------------------------

    /// Put a freshly reset controller into a known serial-control state
    ///
    /// Expects the controller to have been factory reset, calibrated and
    /// switched to Modbus RTU from its own menu. Each step runs even if an
    /// earlier one is not acknowledged; the result is `true` only if all
    /// were. Validation and communication errors abort the routine.
    pub fn setup_routine(&mut self, plan: &SetupPlan) -> Result<bool> {
        info!("Running setup routine on slave {}", self.slave_address);

        let results = [
            ("disable EN pin", self.disable_enable_pin()?),
            ("set work mode", self.set_work_mode(plan.work_mode)?),
            ("enable motor", self.set_serial_mode_motor_enable(EnableDisable::Enabled)?),
            ("clear motor protection", self.clear_motor_protection()?),
            ("set working current", self.set_working_current(plan.working_current_ma)?),
            ("set holding current", self.set_holding_current_percentage(plan.hold_current)?),
            (
                "set step parameters",
                self.set_step_parameters(plan.microsteps_per_step, plan.steps_per_revolution)?,
            ),
        ];

        let mut all_ok = true;
        for (step, ok) in results {
            if !ok {
                warn!("Setup step '{}' was not acknowledged", step);
                all_ok = false;
            }
        }

        self.read_all_config_parameters()?;
        info!("Setup routine finished (all steps acknowledged: {})", all_ok);
        Ok(all_ok)
    }
}
