//! Sensor identifiers
//!
//! Maps raw fancontrol/sysfs tokens such as `hwmon1/temp2_input` to the
//! `(device_index, sensor_index)` pair used as the join key between the
//! configuration file and discovered hardware.
//!
//! Parsing is lenient on purpose: vendor drivers expose odd file names and
//! none of them may abort discovery. An unparseable device index becomes `0`
//! and an unparseable sensor number becomes `-1` after the 1-based to 0-based
//! shift.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::sysfs;

lazy_static! {
    static ref KIND_TOKENS: Regex =
        Regex::new("pwm|fan|temp|_input").expect("kind token pattern is valid");
}

/// The three sensor families exposed by hwmon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorType {
    Temperature,
    Fan,
    Pwm,
}

impl SensorType {
    /// File name prefix (`temp`, `fan`, `pwm`)
    pub fn prefix(self) -> &'static str {
        match self {
            SensorType::Temperature => sysfs::TEMP_PREFIX,
            SensorType::Fan => sysfs::FAN_PREFIX,
            SensorType::Pwm => sysfs::PWM_PREFIX,
        }
    }

    /// Suffix of the value file; PWM outputs have none
    pub fn input_suffix(self) -> &'static str {
        match self {
            SensorType::Temperature | SensorType::Fan => sysfs::INPUT_SUFFIX,
            SensorType::Pwm => "",
        }
    }

    /// Detect the family from a sensor token (`fan1_input` → `Fan`)
    pub fn from_token(token: &str) -> Option<Self> {
        if token.starts_with(sysfs::TEMP_PREFIX) {
            Some(SensorType::Temperature)
        } else if token.starts_with(sysfs::FAN_PREFIX) {
            Some(SensorType::Fan)
        } else if token.starts_with(sysfs::PWM_PREFIX) {
            Some(SensorType::Pwm)
        } else {
            None
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorType::Temperature => write!(f, "temperature"),
            SensorType::Fan => write!(f, "fan"),
            SensorType::Pwm => write!(f, "pwm"),
        }
    }
}

fn lenient_int(s: &str) -> i32 {
    s.trim().parse::<i32>().unwrap_or(0)
}

/// Device index of `hwmon<N>/...`; `0` when absent or unparseable.
pub fn device_index(raw: &str) -> i32 {
    let first = raw.split('/').next().unwrap_or("");
    lenient_int(&first.replace(sysfs::DEVICE_PREFIX, ""))
}

/// Zero-based sensor index of `.../<kind><M>[_input]`; `M - 1`, so `-1` when
/// the number is `0`, missing or unparseable.
pub fn sensor_index(raw: &str) -> i32 {
    let second = raw.split('/').nth(1).unwrap_or("");
    let stripped = KIND_TOKENS.replace_all(second, "");
    lenient_int(&stripped).saturating_sub(1)
}

/// Both indices of a raw identifier
pub fn parse_identifier(raw: &str) -> (i32, i32) {
    (device_index(raw), sensor_index(raw))
}

/// Fully qualified reference to one sensor: the key used by the
/// configuration file and by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorRef {
    pub device_index: i32,
    pub kind: SensorType,
    pub sensor_index: i32,
}

impl SensorRef {
    pub fn new(device_index: i32, kind: SensorType, sensor_index: i32) -> Self {
        Self {
            device_index,
            kind,
            sensor_index,
        }
    }

    pub fn pwm(device_index: i32, sensor_index: i32) -> Self {
        Self::new(device_index, SensorType::Pwm, sensor_index)
    }

    pub fn temp(device_index: i32, sensor_index: i32) -> Self {
        Self::new(device_index, SensorType::Temperature, sensor_index)
    }

    pub fn fan(device_index: i32, sensor_index: i32) -> Self {
        Self::new(device_index, SensorType::Fan, sensor_index)
    }

    /// Parse a fancontrol token. The kind comes from the sensor segment's
    /// prefix; without a `/` or a known prefix there is nothing to refer to.
    pub fn parse(token: &str) -> Option<Self> {
        let (_, sensor) = token.split_once('/')?;
        let kind = SensorType::from_token(sensor)?;
        let (device_index, sensor_index) = parse_identifier(token);
        Some(Self::new(device_index, kind, sensor_index))
    }

    /// Device token (`hwmon0`)
    pub fn device_token(&self) -> String {
        format!("{}{}", sysfs::DEVICE_PREFIX, self.device_index)
    }

    /// Sensor file name (`temp1_input`, `pwm2`)
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}",
            self.kind.prefix(),
            i64::from(self.sensor_index) + 1,
            self.kind.input_suffix()
        )
    }

    /// fancontrol token (`hwmon0/pwm1`)
    pub fn token(&self) -> String {
        format!("{}/{}", self.device_token(), self.file_name())
    }
}

impl fmt::Display for SensorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
