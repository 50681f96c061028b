//! Hardware discovery
//!
//! Enumerates `/sys/class/hwmon` (or any directory laid out like it) into
//! [`Hwmon`] devices:
//! - **Temperature**: `tempN_input` files (millidegrees Celsius)
//! - **Fan**: `fanN_input` files (RPM)
//! - **PWM**: `pwmN` files (0-255 duty cycle)
//!
//! Discovery is best effort. A directory or sensor that cannot be read is
//! skipped or marked stale and recorded in [`Discovery::errors`]; it never
//! aborts the scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::constants::{paths, sysfs};
use crate::data::identifier::{device_index, sensor_index, SensorType};
use crate::data::sensor::{
    read_optional_value, read_trimmed, FanLimits, PwmState, Sensor, SensorKind, TempLimits,
};
use crate::data::Hwmon;
use crate::error::FancontrolError;

/// Result of one scan
#[derive(Debug, Default)]
pub struct Discovery {
    /// Devices ordered by index
    pub hwmons: Vec<Hwmon>,
    /// Non-fatal problems met while scanning
    pub errors: Vec<FancontrolError>,
}

impl Discovery {
    pub fn sensor_count(&self) -> usize {
        self.hwmons.iter().map(Hwmon::sensor_count).sum()
    }

    /// All errors joined into one human-readable line per problem
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

/// Enumerate every device below `root`
pub fn discover(root: &Path) -> Discovery {
    let mut result = Discovery::default();

    if !root.is_dir() {
        warn!(root = ?root, "Hardware monitoring root not found");
        result.errors.push(FancontrolError::RootMissing(root.to_path_buf()));
        return result;
    }

    debug!("Scanning hwmon devices in {:?}", root);

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = ?root, error = %e, "Cannot list hardware monitoring root");
            result
                .errors
                .push(FancontrolError::discovery(root, e.to_string()));
            return result;
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = ?root, error = %e, "Cannot read hardware monitoring entry");
                result.errors.push(FancontrolError::discovery(root, e.to_string()));
                continue;
            }
        };
        let path = entry.path();
        // `is_dir` follows the symlinks sysfs uses for every device
        if !path.is_dir() {
            warn!(path = ?path, "Skipping entry that is not a device directory");
            result.errors.push(FancontrolError::discovery(
                &path,
                "not a device directory or a dangling link",
            ));
            continue;
        }
        dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
    }
    dirs.sort();

    // `/sys/class/hwmon` lives two levels below the sysfs mount
    let sysfs_root = root
        .parent()
        .and_then(Path::parent)
        .and_then(|p| fs::canonicalize(p).ok());

    for (dir_name, path) in dirs {
        trace!("Checking hwmon device: {:?}", path);
        match read_hwmon(&path, &dir_name, sysfs_root.as_deref(), &mut result.errors) {
            Ok(hwmon) => {
                info!(
                    hwmon = %dir_name,
                    chip = %hwmon.name,
                    temps = hwmon.temps.len(),
                    fans = hwmon.fans.len(),
                    pwms = hwmon.pwms.len(),
                    "Found hwmon device"
                );
                result.hwmons.push(hwmon);
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Skipping unreadable hwmon device");
                result.errors.push(e);
            }
        }
    }

    // Stable: equal indices keep directory-name order
    result.hwmons.sort_by_key(|h| h.index);
    report_aliases(&result.hwmons, &mut result.errors);

    if result.hwmons.is_empty() {
        warn!(root = ?root, "No hwmon devices found");
        result.errors.push(FancontrolError::NoDevices(root.to_path_buf()));
    }

    info!("Total hwmon devices found: {}", result.hwmons.len());
    result
}

/// Directories whose names do not carry a number all map to index 0 and
/// shadow each other in lookups
fn report_aliases(hwmons: &[Hwmon], errors: &mut Vec<FancontrolError>) {
    let mut seen: BTreeMap<i32, &Path> = BTreeMap::new();
    for h in hwmons {
        if let Some(first) = seen.get(&h.index) {
            warn!(index = h.index, first = ?first, second = ?h.path, "Duplicate hwmon index");
            errors.push(FancontrolError::discovery(
                &h.path,
                format!("device index {} already used by {}", h.index, first.display()),
            ));
        } else {
            seen.insert(h.index, h.path.as_path());
        }
    }
}

fn read_hwmon(
    path: &Path,
    dir_name: &str,
    sysfs_root: Option<&Path>,
    errors: &mut Vec<FancontrolError>,
) -> Result<Hwmon, FancontrolError> {
    let name = read_trimmed(&path.join(sysfs::NAME_FILE))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| dir_name.to_string());

    let mut hwmon = Hwmon::new(device_index(dir_name), name, path.to_path_buf());
    hwmon.device_path = device_path(path, sysfs_root);

    trace!(chip = %hwmon.name, path = ?path, "Reading hwmon device");

    let mut files: Vec<String> = fs::read_dir(path)
        .map_err(|e| FancontrolError::discovery(path, e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();

    for file in &files {
        let Some(kind) = classify(file) else {
            continue;
        };
        let sensor = read_sensor(&hwmon, file, kind);
        if let Some(err) = &sensor.error {
            errors.push(FancontrolError::SensorRead {
                path: sensor.path.clone(),
                reason: err.clone(),
            });
        }
        trace!(sensor = %file, value = sensor.value, "Found {} sensor", kind);
        hwmon.insert(sensor);
    }

    debug!(
        chip = %hwmon.name,
        temps = hwmon.temps.len(),
        fans = hwmon.fans.len(),
        pwms = hwmon.pwms.len(),
        "Device sensor counts"
    );

    Ok(hwmon)
}

/// Canonical `device` link relative to the sysfs mount
fn device_path(path: &Path, sysfs_root: Option<&Path>) -> Option<String> {
    let target = fs::canonicalize(path.join(sysfs::DEVICE_LINK)).ok()?;
    if let Some(relative) = sysfs_root.and_then(|r| target.strip_prefix(r).ok()) {
        return Some(relative.to_string_lossy().into_owned());
    }
    let full = target.to_string_lossy();
    Some(
        full.strip_prefix(paths::SYSFS_PREFIX)
            .unwrap_or(&full)
            .to_string(),
    )
}

fn numbered(file: &str, prefix: &str, suffix: &str) -> bool {
    file.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Which family a value file belongs to, if any
fn classify(file: &str) -> Option<SensorType> {
    [SensorType::Temperature, SensorType::Fan, SensorType::Pwm]
        .into_iter()
        .find(|kind| numbered(file, kind.prefix(), kind.input_suffix()))
}

fn read_sensor(hwmon: &Hwmon, file: &str, kind: SensorType) -> Sensor {
    let dir = hwmon.path.as_path();
    let base = file.trim_end_matches(sysfs::INPUT_SUFFIX);
    let meta = |suffix: &str| read_optional_value(&dir.join(format!("{}_{}", base, suffix)));

    let payload = match kind {
        SensorType::Temperature => SensorKind::Temperature(TempLimits {
            min: meta("min"),
            max: meta("max"),
            crit: meta("crit"),
        }),
        SensorType::Fan => SensorKind::Fan(FanLimits {
            min: meta("min"),
            max: meta("max"),
            target: meta("target"),
        }),
        SensorType::Pwm => SensorKind::Pwm(PwmState {
            enable: meta("enable"),
            control: None,
        }),
    };

    let index = sensor_index(&format!("{}/{}", hwmon.token(), file));
    let mut sensor = Sensor::new(hwmon.index, index, dir.join(file), payload);
    sensor.label = read_trimmed(&dir.join(format!("{}_label", base))).filter(|l| !l.is_empty());
    // Errors are already stored on the sensor
    let _ = sensor.update();
    sensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{standard_tree, FakeSysfs};

    #[test]
    fn test_discovers_standard_tree() {
        let fake = standard_tree();
        let found = discover(&fake.root());

        assert!(found.errors.is_empty(), "{:?}", found.errors);
        assert_eq!(found.hwmons.len(), 2);

        let h0 = &found.hwmons[0];
        assert_eq!(h0.index, 0);
        assert_eq!(h0.name, "nct6775");
        assert_eq!(h0.temps.len(), 2);
        assert_eq!(h0.fans.len(), 2);
        assert_eq!(h0.pwms.len(), 2);
        assert_eq!(h0.pwms[0].value, 128);
        assert_eq!(h0.fans[0].value, 1200);
        assert!(matches!(&h0.pwms[0].kind, SensorKind::Pwm(s) if s.enable == Some(1)));
        assert!(matches!(&h0.fans[0].kind, SensorKind::Fan(l) if l.min == Some(300)));
        assert_eq!(h0.device_path.as_deref(), Some("devices/platform/nct6775.0"));

        let h1 = &found.hwmons[1];
        assert_eq!(h1.temps[0].label.as_deref(), Some("Package id 0"));
        assert_eq!(h1.temps[0].celsius(), Some(51.0));
        assert_eq!(found.sensor_count(), 7);
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let fake = standard_tree();
        let a = discover(&fake.root());
        let b = discover(&fake.root());
        assert_eq!(a.hwmons, b.hwmons);
    }

    #[test]
    fn test_missing_root_yields_no_devices() {
        let found = discover(Path::new("/nonexistent/hwmon/root"));
        assert!(found.hwmons.is_empty());
        assert!(matches!(found.errors[0], FancontrolError::RootMissing(_)));
        assert!(found.error_message().is_some());
    }

    #[test]
    fn test_empty_root_reports_no_devices() {
        let fake = FakeSysfs::new();
        let found = discover(&fake.root());
        assert!(found.hwmons.is_empty());
        assert!(matches!(found.errors[0], FancontrolError::NoDevices(_)));
    }

    #[test]
    fn test_devices_sorted_numerically() {
        let fake = FakeSysfs::new();
        for i in [10, 2, 0] {
            let d = fake.device(i, "chip");
            fake.write(&d, "temp1_input", "30000");
        }
        let indices: Vec<i32> = discover(&fake.root()).hwmons.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![0, 2, 10]);
    }

    #[test]
    fn test_ignores_non_value_files() {
        let fake = FakeSysfs::new();
        let d = fake.device(0, "it87");
        fake.write(&d, "pwm1", "100");
        fake.write(&d, "pwm1_enable", "1");
        fake.write(&d, "pwm1_freq", "25000");
        fake.write(&d, "temp1_input", "40000");
        fake.write(&d, "temp1_crit_alarm", "0");
        fake.write(&d, "in0_input", "1200");
        fake.write(&d, "fan_input", "1");

        let h = &discover(&fake.root()).hwmons[0];
        assert_eq!(h.pwms.len(), 1);
        assert_eq!(h.temps.len(), 1);
        assert!(h.fans.is_empty());
    }

    #[test]
    fn test_unreadable_sensor_is_stale_not_fatal() {
        let fake = FakeSysfs::new();
        let d = fake.device(0, "nct6775");
        fake.write(&d, "temp1_input", "garbage");
        fake.write(&d, "temp2_input", "35000");

        let found = discover(&fake.root());
        assert_eq!(found.hwmons[0].temps.len(), 2);
        assert!(found.hwmons[0].temps[0].is_stale());
        assert!(!found.hwmons[0].temps[1].is_stale());
        assert_eq!(found.errors.len(), 1);
    }

    #[test]
    fn test_unnumbered_directories_alias_and_warn() {
        let fake = FakeSysfs::new();
        let a = fake.bare_dir("acpitz");
        fake.write(&a, "temp1_input", "27800");
        let b = fake.bare_dir("thermal");
        fake.write(&b, "temp1_input", "30000");

        let found = discover(&fake.root());
        assert_eq!(found.hwmons.len(), 2);
        assert!(found.hwmons.iter().all(|h| h.index == 0));
        assert_eq!(found.hwmons[0].name, "acpitz");
        assert!(found.hwmons[0].device_path.is_none());
        assert_eq!(found.errors.len(), 1);
        assert!(matches!(found.errors[0], FancontrolError::Discovery { .. }));
    }

    #[test]
    fn test_dangling_device_link_is_reported() {
        let fake = standard_tree();
        std::os::unix::fs::symlink(
            fake.root().join("../../devices/platform/gone.9"),
            fake.root().join("hwmon9"),
        )
        .unwrap();

        let found = discover(&fake.root());
        assert_eq!(found.hwmons.len(), 2);
        assert_eq!(found.errors.len(), 1);
        assert!(matches!(
            &found.errors[0],
            FancontrolError::Discovery { path, .. } if path.ends_with("hwmon9")
        ));
        assert!(found.error_message().is_some_and(|m| m.contains("dangling link")));
    }
}
