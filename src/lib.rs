//! # SERVO42D Modbus Library
//!
//! Drive an MKS SERVO42D closed-loop stepper controller over RS485 using
//! Modbus RTU.
//!
//! This library provides RTU framing with CRC-16/Modbus, a blocking serial
//! transport, and a command layer for configuring, moving and reading the
//! motor.

pub mod config;
pub mod error;
pub mod rtu;
pub mod serial;
pub mod servo;
