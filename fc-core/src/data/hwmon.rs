//! Hardware monitor devices
//!
//! A [`Hwmon`] owns every sensor of one discovered `hwmonN` directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::constants::sysfs;
use crate::data::identifier::{SensorRef, SensorType};
use crate::data::sensor::Sensor;
use crate::error::FancontrolError;

/// One discovered hardware monitoring device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hwmon {
    pub index: i32,
    pub name: String,
    /// Device directory (`/sys/class/hwmon/hwmon0`)
    pub path: PathBuf,
    /// Canonical `device` link relative to `/sys`, the DEVPATH identity
    pub device_path: Option<String>,
    pub temps: Vec<Sensor>,
    pub fans: Vec<Sensor>,
    pub pwms: Vec<Sensor>,
}

/// Outcome of refreshing one device
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub changed: usize,
    pub failures: Vec<(SensorRef, FancontrolError)>,
}

impl Hwmon {
    pub fn new(index: i32, name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            index,
            name: name.into(),
            path,
            device_path: None,
            temps: Vec::new(),
            fans: Vec::new(),
            pwms: Vec::new(),
        }
    }

    /// fancontrol device token (`hwmon0`)
    pub fn token(&self) -> String {
        format!("{}{}", sysfs::DEVICE_PREFIX, self.index)
    }

    fn bucket(&self, kind: SensorType) -> &Vec<Sensor> {
        match kind {
            SensorType::Temperature => &self.temps,
            SensorType::Fan => &self.fans,
            SensorType::Pwm => &self.pwms,
        }
    }

    fn bucket_mut(&mut self, kind: SensorType) -> &mut Vec<Sensor> {
        match kind {
            SensorType::Temperature => &mut self.temps,
            SensorType::Fan => &mut self.fans,
            SensorType::Pwm => &mut self.pwms,
        }
    }

    /// Add a sensor keeping its family ordered by index. A second sensor
    /// with the same index replaces the first.
    pub fn insert(&mut self, sensor: Sensor) {
        let bucket = self.bucket_mut(sensor.sensor_type());
        match bucket.binary_search_by_key(&sensor.sensor_index, |s| s.sensor_index) {
            Ok(pos) => bucket[pos] = sensor,
            Err(pos) => bucket.insert(pos, sensor),
        }
    }

    pub fn sensor(&self, kind: SensorType, sensor_index: i32) -> Option<&Sensor> {
        self.bucket(kind).iter().find(|s| s.sensor_index == sensor_index)
    }

    pub fn sensor_mut(&mut self, kind: SensorType, sensor_index: i32) -> Option<&mut Sensor> {
        self.bucket_mut(kind)
            .iter_mut()
            .find(|s| s.sensor_index == sensor_index)
    }

    /// All sensors: temperatures, then fans, then PWM outputs
    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.temps.iter().chain(self.fans.iter()).chain(self.pwms.iter())
    }

    pub fn sensors_mut(&mut self) -> impl Iterator<Item = &mut Sensor> {
        self.temps
            .iter_mut()
            .chain(self.fans.iter_mut())
            .chain(self.pwms.iter_mut())
    }

    pub fn sensor_count(&self) -> usize {
        self.temps.len() + self.fans.len() + self.pwms.len()
    }

    /// Re-read every sensor. A failing sensor is marked stale and reported;
    /// the others are still refreshed.
    pub fn update_sensors(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for sensor in self.sensors_mut() {
            match sensor.update() {
                Ok(true) => report.changed += 1,
                Ok(false) => {}
                Err(e) => report.failures.push((sensor.reference(), e)),
            }
        }
        if !report.failures.is_empty() {
            debug!(
                hwmon = %self.token(),
                failed = report.failures.len(),
                "Some sensors could not be read"
            );
        }
        report
    }
}

/// Find a sensor across devices; the first device with a matching index wins
pub fn find_sensor(hwmons: &[Hwmon], r: SensorRef) -> Option<&Sensor> {
    hwmons
        .iter()
        .find(|h| h.index == r.device_index)
        .and_then(|h| h.sensor(r.kind, r.sensor_index))
}

pub fn find_sensor_mut(hwmons: &mut [Hwmon], r: SensorRef) -> Option<&mut Sensor> {
    hwmons
        .iter_mut()
        .find(|h| h.index == r.device_index)
        .and_then(|h| h.sensor_mut(r.kind, r.sensor_index))
}

/// Find a device by index
pub fn find_hwmon(hwmons: &[Hwmon], index: i32) -> Option<&Hwmon> {
    hwmons.iter().find(|h| h.index == index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sensor::{FanLimits, PwmState, SensorKind};

    fn fan(idx: i32) -> Sensor {
        Sensor::new(
            0,
            idx,
            PathBuf::from(format!("fan{}_input", idx + 1)),
            SensorKind::Fan(FanLimits::default()),
        )
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut h = Hwmon::new(0, "nct6775", PathBuf::from("/sys/class/hwmon/hwmon0"));
        h.insert(fan(2));
        h.insert(fan(0));
        h.insert(fan(1));
        let indices: Vec<i32> = h.fans.iter().map(|s| s.sensor_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(h.sensor_count(), 3);
        assert_eq!(h.token(), "hwmon0");
    }

    #[test]
    fn test_lookup_by_reference() {
        let mut h = Hwmon::new(2, "it87", PathBuf::from("/x"));
        let mut pwm = Sensor::new(2, 0, PathBuf::from("pwm1"), SensorKind::Pwm(PwmState::default()));
        pwm.value = 128;
        h.insert(pwm);
        let hwmons = vec![h];

        assert_eq!(find_sensor(&hwmons, SensorRef::pwm(2, 0)).map(|s| s.value), Some(128));
        assert!(find_sensor(&hwmons, SensorRef::pwm(2, 1)).is_none());
        assert!(find_sensor(&hwmons, SensorRef::fan(2, 0)).is_none());
        assert!(find_hwmon(&hwmons, 2).is_some());
    }
}
