//! # Device Configuration
//!
//! Client-side mirror of the controller's settings.
//!
//! The cache starts empty, is filled in by successful setters and by the
//! bulk configuration read, and is never persisted. It is best effort: the
//! controller stays authoritative.

use bytes::Buf;
use serde::Serialize;

use super::position::degrees_per_microstep;
use super::types::*;
use crate::error::{Result, ServoError};

/// Data bytes in the configuration block (19 registers)
pub const CONFIG_BLOCK_DATA_SIZE: usize = 38;

/// Configuration parameters as reported by register block 0x1147
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationBlock {
    pub work_mode: Decoded<WorkMode>,
    pub hold_current_percent: Decoded<u8>,
    pub working_current_ma: u16,
    pub microsteps_per_step: u8,
    pub enable_pin_mode: Decoded<EnablePinMode>,
    pub direction: Decoded<Direction>,
    pub auto_screen_off: Decoded<EnableDisable>,
    pub stall_protection: Decoded<EnableDisable>,
    pub subdivision_interpolation: Decoded<EnableDisable>,
    pub baud_rate: Decoded<u32>,
    pub slave_address: u8,
    pub group_address: u8,
    pub respond_mode: Decoded<RespondMode>,
    pub modbus_rtu_enabled: Decoded<EnableDisable>,
    pub key_lock: Decoded<KeyLock>,
    pub home_trigger_level: Decoded<TriggerLevel>,
    pub home_direction: Decoded<Direction>,
    pub home_speed: u16,
    pub endstop_limit: Decoded<EnableDisable>,
    pub no_limit_home_reverse_angle: u32,
    pub home_mode: Decoded<HomeMode>,
    pub no_limit_home_current_ma: u16,
    pub limit_port_remap: Decoded<EnableDisable>,
    pub power_on_zero_mode: Decoded<PowerOnZeroMode>,
    pub power_on_zero_speed: u8,
    pub power_on_zero_direction: Decoded<Direction>,
}

fn byte_field<T>(buf: &mut &[u8], decode: impl Fn(u16) -> Option<T>) -> Decoded<T> {
    let code = u16::from(buf.get_u8());
    Decoded::from_option(decode(code), code)
}

impl ConfigurationBlock {
    /// Decode the 38 data bytes of the configuration block
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::ProtocolMismatch`] if `data` is not exactly
    /// 38 bytes long. Unrecognized codes never fail; they decode to
    /// [`Decoded::Unknown`].
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != CONFIG_BLOCK_DATA_SIZE {
            return Err(ServoError::ProtocolMismatch(format!(
                "Configuration block is {} bytes, expected {}",
                data.len(),
                CONFIG_BLOCK_DATA_SIZE
            )));
        }

        let mut buf = data;

        let work_mode = byte_field(&mut buf, WorkMode::from_code);
        let hold_current_percent =
            byte_field(&mut buf, |code| HoldCurrent::from_code(code).map(HoldCurrent::percent));
        let working_current_ma = buf.get_u16();
        let microsteps_per_step = buf.get_u8();
        let enable_pin_mode = byte_field(&mut buf, EnablePinMode::from_code);
        let direction = byte_field(&mut buf, Direction::from_code);
        let auto_screen_off = byte_field(&mut buf, EnableDisable::from_code);
        let stall_protection = byte_field(&mut buf, EnableDisable::from_code);
        let subdivision_interpolation = byte_field(&mut buf, EnableDisable::from_code);
        buf.advance(1);
        let baud_rate = byte_field(&mut buf, baud_rate_from_code);
        let slave_address = buf.get_u8();
        let group_address = buf.get_u8();
        let respond_code = buf.get_u16();
        let respond_mode = Decoded::from_option(RespondMode::from_code(respond_code), respond_code);
        let modbus_rtu_enabled = byte_field(&mut buf, EnableDisable::from_code);
        let key_lock = byte_field(&mut buf, KeyLock::from_code);
        let home_trigger_level = byte_field(&mut buf, TriggerLevel::from_code);
        let home_direction = byte_field(&mut buf, Direction::from_code);
        let home_speed = buf.get_u16();
        buf.advance(1);
        let endstop_limit = byte_field(&mut buf, EnableDisable::from_code);
        let no_limit_home_reverse_angle = buf.get_u32();
        buf.advance(1);
        let home_mode = byte_field(&mut buf, HomeMode::from_code);
        let no_limit_home_current_ma = buf.get_u16();
        buf.advance(1);
        let limit_port_remap = byte_field(&mut buf, EnableDisable::from_code);
        let power_on_zero_mode = byte_field(&mut buf, PowerOnZeroMode::from_code);
        buf.advance(1);
        let power_on_zero_speed = buf.get_u8();
        let power_on_zero_direction = byte_field(&mut buf, Direction::from_code);
        debug_assert!(buf.is_empty());

        Ok(Self {
            work_mode,
            hold_current_percent,
            working_current_ma,
            microsteps_per_step,
            enable_pin_mode,
            direction,
            auto_screen_off,
            stall_protection,
            subdivision_interpolation,
            baud_rate,
            slave_address,
            group_address,
            respond_mode,
            modbus_rtu_enabled,
            key_lock,
            home_trigger_level,
            home_direction,
            home_speed,
            endstop_limit,
            no_limit_home_reverse_angle,
            home_mode,
            no_limit_home_current_ma,
            limit_port_remap,
            power_on_zero_mode,
            power_on_zero_speed,
            power_on_zero_direction,
        })
    }
}

/// Cached view of the controller configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceConfiguration {
    pub microsteps_per_step: Option<u16>,
    pub steps_per_revolution: Option<u16>,
    pub degrees_per_microstep: Option<f64>,
    pub working_current_ma: Option<u16>,
    pub hold_current: Option<HoldCurrent>,
    pub work_mode: Option<WorkMode>,
    /// Last full configuration block read from the controller
    pub block: Option<ConfigurationBlock>,
}

impl DeviceConfiguration {
    /// Record a successful step parameter write
    pub fn set_step_parameters(&mut self, microsteps_per_step: u16, steps_per_revolution: u16) {
        self.microsteps_per_step = Some(microsteps_per_step);
        self.steps_per_revolution = Some(steps_per_revolution);
        self.degrees_per_microstep = degrees_per_microstep(microsteps_per_step, steps_per_revolution);
    }

    /// Degrees per microstep, required by angular moves
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::ConfigurationDependency`] until step parameters
    /// have been set.
    pub fn require_degrees_per_microstep(&self) -> Result<f64> {
        self.degrees_per_microstep
            .ok_or(ServoError::ConfigurationDependency("degrees_per_microstep"))
    }

    /// Merge a freshly read configuration block into the cache
    ///
    /// The controller does not report steps per revolution, so the angle
    /// factor is only recomputed when that is already known.
    pub fn apply_block(&mut self, block: ConfigurationBlock) {
        self.working_current_ma = Some(block.working_current_ma);
        self.work_mode = block.work_mode.known();
        self.hold_current = block
            .hold_current_percent
            .known()
            .and_then(HoldCurrent::from_percent);

        if block.microsteps_per_step != 0 {
            let microsteps = u16::from(block.microsteps_per_step);
            self.microsteps_per_step = Some(microsteps);
            if let Some(steps) = self.steps_per_revolution {
                self.degrees_per_microstep = degrees_per_microstep(microsteps, steps);
            }
        }

        self.block = Some(block);
    }
}
