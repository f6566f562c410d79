//! # Modbus RTU Frame Codec
//!
//! Byte-level encoding and decoding of Modbus RTU frames.
//!
//! This module handles:
//! - Read holding/input register requests (0x03, 0x04)
//! - Write single/multiple register requests (0x06, 0x10)
//! - CRC-16/Modbus calculation and verification
//! - Read response validation and signed payload parsing
//!
//! It performs no I/O and knows nothing about what registers mean.

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
