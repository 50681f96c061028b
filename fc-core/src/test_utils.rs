/*
 * Test utilities for fc-core
 *
 * Builds throwaway hwmon trees and fancontrol files so discovery, polling
 * and configuration tests never touch the real /sys.
 */

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A fake `/sys/class/hwmon` rooted in a temporary directory
pub struct FakeSysfs {
    dir: TempDir,
}

impl FakeSysfs {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("class/hwmon")).unwrap();
        fs::create_dir_all(dir.path().join("devices/platform")).unwrap();
        Self { dir }
    }

    /// The directory to pass to discovery
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("class/hwmon")
    }

    /// Scratch directory for configuration files
    pub fn scratch(&self) -> PathBuf {
        let p = self.dir.path().join("etc");
        fs::create_dir_all(&p).unwrap();
        p
    }

    /// Create `hwmon<index>` with a `name` file and a `device` link
    pub fn device(&self, index: i32, name: &str) -> PathBuf {
        let dev = self.root().join(format!("hwmon{}", index));
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("name"), format!("{}\n", name)).unwrap();

        let target = self.dir.path().join("devices/platform").join(format!("{}.{}", name, index));
        fs::create_dir_all(&target).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, dev.join("device")).unwrap();
        dev
    }

    /// Create a directory under the root without any files
    pub fn bare_dir(&self, dir_name: &str) -> PathBuf {
        let dev = self.root().join(dir_name);
        fs::create_dir_all(&dev).unwrap();
        dev
    }

    /// Write a file inside a device directory
    pub fn write(&self, dev: &Path, file: &str, contents: &str) {
        fs::write(dev.join(file), format!("{}\n", contents)).unwrap();
    }

    pub fn remove(&self, dev: &Path, file: &str) {
        fs::remove_file(dev.join(file)).unwrap();
    }
}

/// Two devices: `hwmon0` (nct6775) with two temps, two fans, two PWMs and
/// `hwmon1` (coretemp) with one labelled temperature
pub fn standard_tree() -> FakeSysfs {
    let fake = FakeSysfs::new();

    let d0 = fake.device(0, "nct6775");
    fake.write(&d0, "temp1_input", "42000");
    fake.write(&d0, "temp1_max", "80000");
    fake.write(&d0, "temp2_input", "38500");
    fake.write(&d0, "fan1_input", "1200");
    fake.write(&d0, "fan1_min", "300");
    fake.write(&d0, "fan2_input", "850");
    fake.write(&d0, "pwm1", "128");
    fake.write(&d0, "pwm1_enable", "1");
    fake.write(&d0, "pwm2", "255");

    let d1 = fake.device(1, "coretemp");
    fake.write(&d1, "temp1_input", "51000");
    fake.write(&d1, "temp1_label", "Package id 0");
    fake.write(&d1, "temp1_crit", "100000");

    fake
}

/// A configuration matching [`standard_tree`]
pub const STANDARD_CONFIG: &str = "\
# Configuration file generated by pwmconfig, changes will be lost
INTERVAL=10
DEVPATH=hwmon0=devices/platform/nct6775.0 hwmon1=devices/platform/coretemp.1
DEVNAME=hwmon0=nct6775 hwmon1=coretemp
FCTEMPS=hwmon0/pwm1=hwmon1/temp1_input hwmon0/pwm2=hwmon0/temp2_input
FCFANS=hwmon0/pwm1=hwmon0/fan1_input hwmon0/pwm2=hwmon0/fan2_input
MINTEMP=hwmon0/pwm1=30 hwmon0/pwm2=35
MAXTEMP=hwmon0/pwm1=70 hwmon0/pwm2=65
MINSTART=hwmon0/pwm1=150 hwmon0/pwm2=120
MINSTOP=hwmon0/pwm1=40 hwmon0/pwm2=60
";
