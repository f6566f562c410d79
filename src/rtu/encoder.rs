//! # Modbus RTU Request Encoder
//!
//! Builds complete request frames (address, function, payload, CRC).

use bytes::{BufMut, BytesMut};

use super::crc::crc16;
use super::protocol::*;

/// Append the little-endian CRC of everything already in `buf`
fn finish_frame(mut buf: BytesMut) -> Vec<u8> {
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    buf.to_vec()
}

/// Encode a read-registers request (function 0x03 or 0x04)
///
/// # Arguments
///
/// * `slave` - Slave address
/// * `function` - [`FunctionCode::ReadHoldingRegisters`] or [`FunctionCode::ReadInputRegisters`]
/// * `start_address` - First register to read
/// * `quantity` - Number of registers
///
/// # Returns
///
/// * `Vec<u8>` - 8-byte frame
///
/// # Examples
///
/// ```
/// use servo42d_modbus::rtu::encoder::build_read_frame;
/// use servo42d_modbus::rtu::protocol::FunctionCode;
///
/// let frame = build_read_frame(0x01, FunctionCode::ReadHoldingRegisters, 0x0000, 0x0002);
/// assert_eq!(frame, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]);
/// ```
pub fn build_read_frame(slave: u8, function: FunctionCode, start_address: u16, quantity: u16) -> Vec<u8> {
    debug_assert!(matches!(
        function,
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters
    ));

    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + CRC_SIZE);
    buf.put_u8(slave);
    buf.put_u8(function.value());
    buf.put_u16(start_address);
    buf.put_u16(quantity);
    finish_frame(buf)
}

/// Encode a write-single-register request (function 0x06)
///
/// The slave acknowledges by echoing this exact frame.
pub fn build_write_single_frame(slave: u8, address: u16, value: u16) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + CRC_SIZE);
    buf.put_u8(slave);
    buf.put_u8(FunctionCode::WriteSingleRegister.value());
    buf.put_u16(address);
    buf.put_u16(value);
    finish_frame(buf)
}

/// Encode a write-multiple-registers request (function 0x10)
///
/// `register_quantity` and `byte_quantity` are written as given; they are not
/// checked against `payload.len()`.
pub fn build_write_multiple_frame(
    slave: u8,
    start_address: u16,
    register_quantity: u16,
    byte_quantity: u8,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(WRITE_MULTIPLE_HEADER_SIZE + payload.len() + CRC_SIZE);
    buf.put_u8(slave);
    buf.put_u8(FunctionCode::WriteMultipleRegisters.value());
    buf.put_u16(start_address);
    buf.put_u16(register_quantity);
    buf.put_u8(byte_quantity);
    buf.put_slice(payload);
    finish_frame(buf)
}

/// Encode the acknowledgement a slave sends for a write-multiple request
///
/// Used to compare responses against the exact frame the device should send.
pub fn build_write_multiple_ack(slave: u8, start_address: u16, register_quantity: u16) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + CRC_SIZE);
    buf.put_u8(slave);
    buf.put_u8(FunctionCode::WriteMultipleRegisters.value());
    buf.put_u16(start_address);
    buf.put_u16(register_quantity);
    finish_frame(buf)
}

/// Encode a read response carrying `data` (addr, func, byte count, data, CRC)
///
/// Used to build the candidate responses of status registers.
pub fn build_read_response(slave: u8, function: FunctionCode, data: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(READ_RESPONSE_OVERHEAD + data.len());
    buf.put_u8(slave);
    buf.put_u8(function.value());
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
    finish_frame(buf)
}
