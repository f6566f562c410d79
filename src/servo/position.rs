//! Encoder position and angle conversions.

use serde::Serialize;

use super::registers::ENCODER_UNITS_PER_REVOLUTION;

/// Encoder position read from the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncoderReading {
    /// Raw signed 48-bit count, 16384 per revolution
    pub count: i64,

    /// Angle from zero in degrees
    pub total_degrees: f64,

    /// Whole revolutions, rounded toward negative infinity
    pub rotations: i64,

    /// Degrees past `rotations`, in `[0, 360)`
    pub remaining_degrees: f64,
}

impl EncoderReading {
    /// Convert a raw encoder count into angles
    ///
    /// # Examples
    ///
    /// ```
    /// use servo42d_modbus::servo::position::EncoderReading;
    ///
    /// let reading = EncoderReading::from_count(16384 + 4096);
    /// assert_eq!(reading.rotations, 1);
    /// assert!((reading.remaining_degrees - 90.0).abs() < 1e-9);
    /// ```
    pub fn from_count(count: i64) -> Self {
        let total_degrees = count as f64 * (360.0 / ENCODER_UNITS_PER_REVOLUTION);
        Self {
            count,
            total_degrees,
            rotations: total_degrees.div_euclid(360.0) as i64,
            remaining_degrees: total_degrees.rem_euclid(360.0),
        }
    }
}

/// Degrees moved by one microstep
///
/// Returns `None` if either factor is zero.
pub fn degrees_per_microstep(microsteps_per_step: u16, steps_per_revolution: u16) -> Option<f64> {
    let microsteps_per_revolution = f64::from(microsteps_per_step) * f64::from(steps_per_revolution);
    if microsteps_per_revolution == 0.0 {
        return None;
    }
    Some(360.0 / microsteps_per_revolution)
}

/// Pulses needed to turn `degrees`, truncated toward zero
pub fn degrees_to_pulses(degrees: f64, degrees_per_microstep: f64) -> f64 {
    (degrees / degrees_per_microstep).trunc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count() {
        let reading = EncoderReading::from_count(0);
        assert_eq!(reading.total_degrees, 0.0);
        assert_eq!(reading.rotations, 0);
        assert_eq!(reading.remaining_degrees, 0.0);
    }

    #[test]
    fn test_positive_count() {
        // 2.5 revolutions
        let reading = EncoderReading::from_count(40960);
        assert!((reading.total_degrees - 900.0).abs() < 1e-9);
        assert_eq!(reading.rotations, 2);
        assert!((reading.remaining_degrees - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_count_floors() {
        // -90 degrees is one revolution back plus 270
        let reading = EncoderReading::from_count(-4096);
        assert!((reading.total_degrees + 90.0).abs() < 1e-9);
        assert_eq!(reading.rotations, -1);
        assert!((reading.remaining_degrees - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_negative_revolution() {
        let reading = EncoderReading::from_count(-16384);
        assert_eq!(reading.rotations, -1);
        assert_eq!(reading.remaining_degrees, 0.0);
    }

    #[test]
    fn test_degrees_per_microstep() {
        let dpm = degrees_per_microstep(16, 200).unwrap();
        assert!((dpm - 0.1125).abs() < 1e-12);
        assert_eq!(degrees_per_microstep(0, 200), None);
        assert_eq!(degrees_per_microstep(16, 0), None);
    }

    #[test]
    fn test_degrees_to_pulses() {
        let dpm = degrees_per_microstep(16, 200).unwrap();
        assert_eq!(degrees_to_pulses(90.0, dpm), 800.0);
        assert_eq!(degrees_to_pulses(360.0, dpm), 3200.0);
        // Fractional microsteps are dropped
        assert_eq!(degrees_to_pulses(0.2, dpm), 1.0);
    }
}
