//! # Modbus RTU Protocol Constants and Types
//!
//! Core protocol definitions for Modbus RTU framing.

use std::fmt;

/// Bit set in the function byte of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Read/write-single request size without CRC: addr + func + 2×u16
pub const REQUEST_HEADER_SIZE: usize = 6;

/// Write-multiple request header size: addr + func + start + qty + byte count
pub const WRITE_MULTIPLE_HEADER_SIZE: usize = 7;

/// CRC trailer size
pub const CRC_SIZE: usize = 2;

/// Smallest frame worth decoding: addr + func + crc
pub const MIN_FRAME_SIZE: usize = 4;

/// Read response overhead: addr + func + byte count + crc
pub const READ_RESPONSE_OVERHEAD: usize = 5;

/// Largest register count a single read may request
pub const MAX_READ_QUANTITY: u16 = 125;

/// Largest payload a write-multiple request may carry (123 registers)
pub const MAX_WRITE_PAYLOAD: usize = 246;

/// Modbus function codes used by this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
    WriteSingleRegister = 0x06,
    WriteMultipleRegisters = 0x10,
}

impl FunctionCode {
    /// Wire value of the function code
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Parse a function byte, ignoring codes this driver never sends
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x06 => Some(Self::WriteSingleRegister),
            0x10 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }
}

/// Exception codes a slave may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetDevice,
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::ServerDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::ServerDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetDevice,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::ServerDeviceFailure => "server device failure",
            Self::Acknowledge => "acknowledge",
            Self::ServerDeviceBusy => "server device busy",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetDevice => "gateway target device failed to respond",
            Self::Unknown(code) => return write!(f, "unknown exception 0x{:02X}", code),
        };
        f.write_str(text)
    }
}

/// A CRC-checked RTU frame split into its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtuFrame {
    /// Slave address
    pub slave: u8,

    /// Raw function byte (may carry [`EXCEPTION_FLAG`])
    pub function: u8,

    /// Bytes between the function byte and the CRC
    pub payload: Vec<u8>,
}

impl RtuFrame {
    /// Whether the slave answered with an exception
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// Exception code carried by an exception response
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        if !self.is_exception() {
            return None;
        }
        self.payload.first().map(|&code| ExceptionCode::from(code))
    }
}

/// Render bytes as space separated hex for log lines, e.g. `01 06 00 80`
pub fn format_frame(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
