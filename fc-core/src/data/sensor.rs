//! Sensor entities
//!
//! One physical input or output of a hwmon chip. The family is a closed
//! tagged union: [`SensorKind`] carries the payload that only makes sense
//! for that family, and callers match on it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::constants::temperature;
use crate::data::control::FanControl;
use crate::data::identifier::{SensorRef, SensorType};
use crate::error::{FancontrolError, Result};

/// Static limits of a temperature input, in millidegrees Celsius
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempLimits {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub crit: Option<i64>,
}

/// Static limits of a fan input, in RPM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanLimits {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub target: Option<i64>,
}

/// State of a PWM output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmState {
    /// `pwmN_enable` mode (0 off, 1 manual, 2+ automatic)
    pub enable: Option<i64>,
    /// fancontrol settings, attached by reconciliation or user edits
    pub control: Option<FanControl>,
}

/// Family-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Temperature(TempLimits),
    Fan(FanLimits),
    Pwm(PwmState),
}

impl SensorKind {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            SensorKind::Temperature(_) => SensorType::Temperature,
            SensorKind::Fan(_) => SensorType::Fan,
            SensorKind::Pwm(_) => SensorType::Pwm,
        }
    }
}

/// One discovered sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub device_index: i32,
    pub sensor_index: i32,
    /// Backing value file
    pub path: PathBuf,
    pub label: Option<String>,
    /// Last good value in device units
    pub value: i64,
    /// Set when the last read failed; `value` is then stale
    pub error: Option<String>,
    /// Configuration edited since it was last absorbed into the config model
    pub dirty: bool,
    pub kind: SensorKind,
}

impl Sensor {
    pub fn new(device_index: i32, sensor_index: i32, path: PathBuf, kind: SensorKind) -> Self {
        Self {
            device_index,
            sensor_index,
            path,
            label: None,
            value: 0,
            error: None,
            dirty: false,
            kind,
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        self.kind.sensor_type()
    }

    pub fn reference(&self) -> SensorRef {
        SensorRef::new(self.device_index, self.sensor_type(), self.sensor_index)
    }

    /// File name without the directory (`fan2_input`)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.reference().file_name())
    }

    /// Label if the driver provides one, else the file stem (`temp1`)
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => self.file_name().trim_end_matches("_input").to_string(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }

    /// Temperature in degrees Celsius; `None` for fans and PWM outputs
    pub fn celsius(&self) -> Option<f64> {
        match self.kind {
            SensorKind::Temperature(_) => Some(self.value as f64 / temperature::MILLIDEGREE_DIVISOR),
            _ => None,
        }
    }

    pub fn control(&self) -> Option<&FanControl> {
        match &self.kind {
            SensorKind::Pwm(state) => state.control.as_ref(),
            _ => None,
        }
    }

    /// Replace the fan-control settings of a PWM output and mark the sensor
    /// dirty. Other families have no settings to edit.
    pub fn set_control(&mut self, control: Option<FanControl>) -> Result<()> {
        match &mut self.kind {
            SensorKind::Pwm(state) => {
                if state.control != control {
                    state.control = control;
                    self.dirty = true;
                }
                Ok(())
            }
            _ => Err(FancontrolError::config(format!(
                "{} is not a PWM output",
                self.reference()
            ))),
        }
    }

    /// Replace settings with what the configuration file says; the sensor
    /// is clean afterwards
    pub(crate) fn attach_control(&mut self, control: Option<FanControl>) {
        if let SensorKind::Pwm(state) = &mut self.kind {
            state.control = control;
        }
        self.dirty = false;
    }

    /// Re-read the value file.
    ///
    /// Returns whether the value changed. On failure the previous value is
    /// kept, the sensor is marked stale and the error is returned.
    pub fn update(&mut self) -> Result<bool> {
        match read_value(&self.path) {
            Ok(v) => {
                let changed = v != self.value || self.error.is_some();
                self.value = v;
                self.error = None;
                trace!(sensor = %self.reference(), value = v, "Sensor updated");
                Ok(changed)
            }
            Err(e) => {
                if self.error.is_none() {
                    warn!(sensor = %self.reference(), error = %e, "Sensor became unreadable");
                }
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// Read an integer value file
pub fn read_value(path: &Path) -> Result<i64> {
    let raw = fs::read_to_string(path).map_err(|e| FancontrolError::SensorRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    raw.trim()
        .parse::<i64>()
        .map_err(|e| FancontrolError::SensorRead {
            path: path.to_path_buf(),
            reason: format!("invalid value {:?}: {}", raw.trim(), e),
        })
}

/// Read an optional metadata file; absence or garbage yields `None`
pub fn read_optional_value(path: &Path) -> Option<i64> {
    if !path.exists() {
        return None;
    }
    match read_value(path) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(path = ?path, error = %e, "Ignoring unreadable metadata file");
            None
        }
    }
}

/// Read a trimmed text file such as a label or chip name
pub fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
