//! # Modbus RTU Response Decoder
//!
//! Validates response frames and extracts register data.

use super::crc::verify_crc;
use super::protocol::*;
use crate::error::{Result, ServoError};

/// Decode a complete RTU frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (address, function, payload, CRC)
///
/// # Returns
///
/// * `Result<RtuFrame>` - Decoded frame, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<RtuFrame> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(ServoError::ProtocolMismatch(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }

    if !verify_crc(frame) {
        return Err(ServoError::ProtocolMismatch(format!(
            "CRC mismatch in frame [{}]",
            format_frame(frame)
        )));
    }

    Ok(RtuFrame {
        slave: frame[0],
        function: frame[1],
        payload: frame[2..frame.len() - CRC_SIZE].to_vec(),
    })
}

/// Decode the response to a read-registers request
///
/// # Arguments
///
/// * `frame` - Response bytes as received
/// * `slave` - Slave address the request went to
/// * `function` - Function code of the request
/// * `quantity` - Number of registers requested
///
/// # Returns
///
/// * `Result<Vec<u8>>` - The `2 × quantity` data bytes
///
/// # Errors
///
/// Returns [`ServoError::ProtocolMismatch`] if the CRC is wrong, the slave
/// answered with an exception, or the address, function, byte count or
/// frame length differ from what the request implies.
pub fn decode_read_response(frame: &[u8], slave: u8, function: FunctionCode, quantity: u16) -> Result<Vec<u8>> {
    let decoded = decode_frame(frame)?;

    if decoded.slave != slave {
        return Err(ServoError::ProtocolMismatch(format!(
            "Response from slave {} (expected {})",
            decoded.slave, slave
        )));
    }

    if let Some(exception) = decoded.exception_code() {
        if decoded.function & !EXCEPTION_FLAG == function.value() {
            return Err(ServoError::ProtocolMismatch(format!(
                "Slave {} answered function 0x{:02X} with exception: {}",
                slave,
                function.value(),
                exception
            )));
        }
    }

    if decoded.function != function.value() {
        return Err(ServoError::ProtocolMismatch(format!(
            "Unexpected function 0x{:02X} (expected 0x{:02X})",
            decoded.function,
            function.value()
        )));
    }

    let expected_bytes = usize::from(quantity) * 2;
    let Some((&byte_count, data)) = decoded.payload.split_first() else {
        return Err(ServoError::ProtocolMismatch("Read response has no byte count".to_string()));
    };

    if usize::from(byte_count) != expected_bytes || data.len() != expected_bytes {
        return Err(ServoError::ProtocolMismatch(format!(
            "Read response carries {} data bytes (byte count {}), expected {}",
            data.len(),
            byte_count,
            expected_bytes
        )));
    }

    Ok(data.to_vec())
}

/// Parse a signed 48-bit big-endian integer
///
/// # Examples
///
/// ```
/// use servo42d_modbus::rtu::decoder::parse_int48;
///
/// assert_eq!(parse_int48([0x00, 0x00, 0x00, 0x00, 0x00, 0x01]), 1);
/// assert_eq!(parse_int48([0xFF; 6]), -1);
/// ```
pub fn parse_int48(bytes: [u8; 6]) -> i64 {
    let mut wide = [0u8; 8];
    wide[2..].copy_from_slice(&bytes);
    // Shift the 48-bit value to the top of the i64 and back to sign-extend
    (i64::from_be_bytes(wide) << 16) >> 16
}
