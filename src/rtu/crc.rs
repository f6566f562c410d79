//! # CRC-16/Modbus Implementation
//!
//! CRC-16 checksum used by Modbus RTU framing.
//!
//! **Polynomial**: 0xA001 (0x8005 reflected)
//! **Initial Value**: 0xFFFF
//! **Wire order**: low byte first

/// CRC-16/Modbus polynomial (reflected form)
const CRC16_POLY: u16 = 0xA001;

/// CRC-16/Modbus initial register value
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the Modbus CRC-16 of `data` using the lookup table
///
/// # Arguments
///
/// * `data` - Frame bytes without the trailing CRC (address + function + payload)
///
/// # Returns
///
/// * `u16` - CRC register value; transmit it with [`u16::to_le_bytes`]
///
/// # Examples
///
/// ```
/// use servo42d_modbus::rtu::crc::crc16;
///
/// let crc = crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
/// assert_eq!(crc.to_le_bytes(), [0xC4, 0x0B]);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        let index = ((crc ^ u16::from(byte)) & 0x00FF) as usize;
        crc = (crc >> 8) ^ CRC16_TABLE[index];
    }

    crc
}

/// Check the trailing CRC of a complete frame
///
/// A frame is valid iff recomputing the CRC over everything except the last
/// two bytes reproduces those two bytes (little-endian). Frames shorter than
/// two bytes are never valid.
pub fn verify_crc(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }

    let (body, trailer) = frame.split_at(frame.len() - 2);
    crc16(body).to_le_bytes() == [trailer[0], trailer[1]]
}

/// Bitwise CRC-16/Modbus, used to cross-check the lookup table
#[allow(dead_code)]
fn crc16_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= u16::from(byte);

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(data: &[u8]) -> Vec<u8> {
        let mut frame = data.to_vec();
        frame.extend_from_slice(&crc16(data).to_le_bytes());
        frame
    }

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_reference_read_request() {
        // Reference frame: 01 03 00 00 00 02 C4 0B
        let data = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(crc16(&data), 0x0BC4);
        assert_eq!(crc16(&data).to_le_bytes(), [0xC4, 0x0B]);
    }

    #[test]
    fn test_crc16_known_device_frames() {
        // Calibrate request as sent to a SERVO42D at address 1
        assert_eq!(crc16(&[0x01, 0x06, 0x00, 0x80, 0x00, 0x01]).to_le_bytes(), [0x49, 0xE2]);
        // Encoder read request
        assert_eq!(crc16(&[0x01, 0x04, 0x00, 0x31, 0x00, 0x03]).to_le_bytes(), [0xE1, 0xC4]);
    }

    #[test]
    fn test_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x01, 0x10, 0x00, 0xFD, 0x00, 0x04, 0x08],
            vec![0x00; 43],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(crc16(data), crc16_slow(data), "CRC mismatch for data: {:?}", data);
        }
    }

    #[test]
    fn test_verify_crc_accepts_appended_checksum() {
        for data in [
            vec![0x00],
            vec![0x01, 0x04, 0x02, 0x00, 0x01],
            (0u8..=255).collect::<Vec<_>>(),
        ] {
            assert!(verify_crc(&with_crc(&data)), "frame rejected: {:?}", data);
        }
    }

    #[test]
    fn test_verify_crc_detects_single_bit_flip() {
        let frame = with_crc(&[0x01, 0x06, 0x00, 0x83, 0x0B, 0xB8]);

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(
                    !verify_crc(&corrupted),
                    "bit {} of byte {} flipped but CRC still valid",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_verify_crc_short_frames() {
        assert!(!verify_crc(&[]));
        assert!(!verify_crc(&[0xFF]));
        // Two bytes: CRC over empty body is 0xFFFF
        assert!(verify_crc(&[0xFF, 0xFF]));
    }
}
