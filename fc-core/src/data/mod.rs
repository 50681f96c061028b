//! Data model
//!
//! Sensor identifiers, sensors, devices and the per-output fan-control
//! settings they carry.

pub mod control;
pub mod hwmon;
pub mod identifier;
pub mod sensor;

pub use control::FanControl;
pub use hwmon::{find_hwmon, find_sensor, find_sensor_mut, Hwmon, UpdateReport};
pub use identifier::{device_index, parse_identifier, sensor_index, SensorRef, SensorType};
pub use sensor::{
    read_optional_value, read_trimmed, read_value, FanLimits, PwmState, Sensor, SensorKind,
    TempLimits,
};
