//! Register value encodings for the SERVO42D.
//!
//! Every enum maps to the exact number the controller stores; `value()`
//! encodes for writes and `from_code()` decodes reads.

use serde::{Deserialize, Serialize};

/// A decoded register field, or the raw code when it is not recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Decoded<T> {
    Known(T),
    Unknown { unknown_code: u16 },
}

impl<T> Decoded<T> {
    /// Build from an optional decode, keeping the raw code on failure
    pub fn from_option(decoded: Option<T>, code: u16) -> Self {
        match decoded {
            Some(value) => Self::Known(value),
            None => Self::Unknown { unknown_code: code },
        }
    }

    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown { .. } => None,
        }
    }
}

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Cw,
    Ccw,
}

impl Direction {
    pub fn value(self) -> u8 {
        match self {
            Self::Cw => 0x00,
            Self::Ccw => 0x01,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Cw),
            1 => Some(Self::Ccw),
            _ => None,
        }
    }
}

/// Control mode (register 0x0082)
///
/// `Cr*` modes take step/dir pulses, `Sr*` modes take serial commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkMode {
    #[serde(rename = "CR_OPEN")]
    CrOpen,
    #[serde(rename = "CR_CLOSE")]
    CrClose,
    #[serde(rename = "CR_vFOC")]
    CrVfoc,
    #[serde(rename = "SR_OPEN")]
    SrOpen,
    #[serde(rename = "SR_CLOSE")]
    SrClose,
    #[serde(rename = "SR_vFOC")]
    SrVfoc,
}

impl WorkMode {
    pub fn value(self) -> u16 {
        match self {
            Self::CrOpen => 0,
            Self::CrClose => 1,
            Self::CrVfoc => 2,
            Self::SrOpen => 3,
            Self::SrClose => 4,
            Self::SrVfoc => 5,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::CrOpen),
            1 => Some(Self::CrClose),
            2 => Some(Self::CrVfoc),
            3 => Some(Self::SrOpen),
            4 => Some(Self::SrClose),
            5 => Some(Self::SrVfoc),
            _ => None,
        }
    }
}

/// Holding current as a share of the working current (register 0x009B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoldCurrent {
    Percent10,
    Percent20,
    Percent30,
    Percent40,
    Percent50,
    Percent60,
    Percent70,
    Percent80,
    Percent90,
    Percent100,
}

impl HoldCurrent {
    const ALL: [HoldCurrent; 10] = [
        Self::Percent10,
        Self::Percent20,
        Self::Percent30,
        Self::Percent40,
        Self::Percent50,
        Self::Percent60,
        Self::Percent70,
        Self::Percent80,
        Self::Percent90,
        Self::Percent100,
    ];

    /// Register ordinal: 0 = 10% … 9 = 100%
    pub fn value(self) -> u16 {
        self as u16
    }

    pub fn percent(self) -> u8 {
        (self as u8 + 1) * 10
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Parse a percentage; only multiples of ten from 10 to 100 exist
    pub fn from_percent(percent: u8) -> Option<Self> {
        if percent % 10 != 0 || percent == 0 {
            return None;
        }
        Self::ALL.get(usize::from(percent / 10 - 1)).copied()
    }
}

/// Generic on/off register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableDisable {
    Disabled,
    Enabled,
}

impl EnableDisable {
    pub fn value(self) -> u16 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabled),
            _ => None,
        }
    }
}

/// Behaviour of the physical EN pin (register 0x0085)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnablePinMode {
    ActiveLow,
    ActiveHigh,
    AlwaysActive,
}

impl EnablePinMode {
    pub fn value(self) -> u16 {
        match self {
            Self::ActiveLow => 0,
            Self::ActiveHigh => 1,
            Self::AlwaysActive => 2,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::ActiveLow),
            1 => Some(Self::ActiveHigh),
            2 => Some(Self::AlwaysActive),
            _ => None,
        }
    }
}

/// Baud rate code stored by the controller
pub fn baud_rate_from_code(code: u16) -> Option<u32> {
    match code {
        1 => Some(9_600),
        2 => Some(19_200),
        3 => Some(25_000),
        4 => Some(38_400),
        5 => Some(57_600),
        6 => Some(115_200),
        7 => Some(256_000),
        _ => None,
    }
}

/// How the slave answers serial commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondMode {
    Respond,
    NoRespond,
    Active,
    NoActive,
}

impl RespondMode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Respond),
            1 => Some(Self::NoRespond),
            2 => Some(Self::Active),
            3 => Some(Self::NoActive),
            _ => None,
        }
    }
}

/// Front-panel key lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLock {
    Unlocked,
    Locked,
}

impl KeyLock {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Unlocked),
            1 => Some(Self::Locked),
            _ => None,
        }
    }
}

/// Active level of the home switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerLevel {
    Low,
    High,
}

impl TriggerLevel {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Low),
            1 => Some(Self::High),
            _ => None,
        }
    }
}

/// Homing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeMode {
    /// Home against a limit switch
    Limited,
    /// Home by stalling against a hard stop
    NoLimit,
}

impl HomeMode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Limited),
            1 => Some(Self::NoLimit),
            _ => None,
        }
    }
}

/// Return-to-zero behaviour after power on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerOnZeroMode {
    #[serde(rename = "disabled")]
    Disabled,
    DirMode,
    NearMode,
}

impl PowerOnZeroMode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Disabled),
            1 => Some(Self::DirMode),
            2 => Some(Self::NearMode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_values() {
        assert_eq!(Direction::Cw.value(), 0);
        assert_eq!(Direction::Ccw.value(), 1);
        assert_eq!(Direction::from_code(1), Some(Direction::Ccw));
        assert_eq!(Direction::from_code(2), None);
    }

    #[test]
    fn test_work_mode_round_trip() {
        for code in 0..6 {
            let mode = WorkMode::from_code(code).unwrap();
            assert_eq!(mode.value(), code);
        }
        assert_eq!(WorkMode::from_code(6), None);
        assert_eq!(WorkMode::SrClose.value(), 4);
    }

    #[test]
    fn test_work_mode_deserialize_names() {
        #[derive(Deserialize)]
        struct Holder {
            mode: WorkMode,
        }

        let holder: Holder = toml::from_str("mode = \"SR_CLOSE\"").unwrap();
        assert_eq!(holder.mode, WorkMode::SrClose);
        let holder: Holder = toml::from_str("mode = \"CR_vFOC\"").unwrap();
        assert_eq!(holder.mode, WorkMode::CrVfoc);
    }

    #[test]
    fn test_hold_current_ordinals() {
        assert_eq!(HoldCurrent::Percent10.value(), 0);
        assert_eq!(HoldCurrent::Percent50.value(), 4);
        assert_eq!(HoldCurrent::Percent100.value(), 9);
        assert_eq!(HoldCurrent::Percent100.percent(), 100);
        assert_eq!(HoldCurrent::from_code(9), Some(HoldCurrent::Percent100));
        assert_eq!(HoldCurrent::from_code(10), None);
    }

    #[test]
    fn test_hold_current_from_percent() {
        assert_eq!(HoldCurrent::from_percent(10), Some(HoldCurrent::Percent10));
        assert_eq!(HoldCurrent::from_percent(50), Some(HoldCurrent::Percent50));
        assert_eq!(HoldCurrent::from_percent(100), Some(HoldCurrent::Percent100));
        assert_eq!(HoldCurrent::from_percent(0), None);
        assert_eq!(HoldCurrent::from_percent(55), None);
        assert_eq!(HoldCurrent::from_percent(110), None);
    }

    #[test]
    fn test_baud_rate_codes() {
        assert_eq!(baud_rate_from_code(4), Some(38_400));
        assert_eq!(baud_rate_from_code(7), Some(256_000));
        assert_eq!(baud_rate_from_code(0), None);
        assert_eq!(baud_rate_from_code(8), None);
    }

    #[test]
    fn test_decoded_keeps_unknown_code() {
        let decoded = Decoded::from_option(EnablePinMode::from_code(7), 7);
        assert_eq!(decoded, Decoded::Unknown { unknown_code: 7 });
        assert_eq!(decoded.known(), None);

        let decoded = Decoded::from_option(EnablePinMode::from_code(2), 2);
        assert_eq!(decoded.known(), Some(EnablePinMode::AlwaysActive));
    }

    #[test]
    fn test_decoded_serializes_untagged() {
        let known: Decoded<KeyLock> = Decoded::Known(KeyLock::Locked);
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"locked\"");

        let unknown: Decoded<KeyLock> = Decoded::Unknown { unknown_code: 9 };
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "{\"unknown_code\":9}");
    }
}
