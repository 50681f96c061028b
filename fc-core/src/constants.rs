//! Constants and configuration values for fancontrol-gui
//!
//! Centralizes paths, defaults and the fancontrol file vocabulary.

/// System paths
pub mod paths {
    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Prefix stripped from canonical device links to form a DEVPATH entry
    pub const SYSFS_PREFIX: &str = "/sys/";

    /// Default fancontrol configuration file
    pub const FANCONTROL_CONFIG: &str = "/etc/fancontrol";

    /// Directory name used under the user's config dir
    pub const APP_DIR: &str = "fancontrol-gui";

    /// Settings file name
    pub const SETTINGS_FILE: &str = "settings.json";

    /// Environment variable overriding the settings directory
    pub const CONFIG_DIR_ENV: &str = "FANCONTROL_GUI_CONFIG_DIR";

    /// User configuration directory
    ///
    /// `FANCONTROL_GUI_CONFIG_DIR` wins, then `$XDG_CONFIG_HOME`, then
    /// whatever `dirs` resolves for the platform.
    pub fn user_config_dir() -> Option<std::path::PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Some(std::path::PathBuf::from(dir));
            }
        }
        let base = match std::env::var("XDG_CONFIG_HOME") {
            Ok(xdg) if !xdg.is_empty() => Some(std::path::PathBuf::from(xdg)),
            _ => dirs::config_dir(),
        };
        base.map(|p| p.join(APP_DIR))
    }
}

/// sysfs file naming
pub mod sysfs {
    /// Device directory prefix (`hwmon0`)
    pub const DEVICE_PREFIX: &str = "hwmon";
    /// Chip name file inside a device directory
    pub const NAME_FILE: &str = "name";
    /// Link to the underlying device
    pub const DEVICE_LINK: &str = "device";
    /// Suffix of value files for temperatures and fans
    pub const INPUT_SUFFIX: &str = "_input";

    pub const TEMP_PREFIX: &str = "temp";
    pub const FAN_PREFIX: &str = "fan";
    pub const PWM_PREFIX: &str = "pwm";
}

/// fancontrol configuration file vocabulary
pub mod fancontrol {
    pub const INTERVAL: &str = "INTERVAL";
    pub const DEVPATH: &str = "DEVPATH";
    pub const DEVNAME: &str = "DEVNAME";
    pub const FCTEMPS: &str = "FCTEMPS";
    pub const FCFANS: &str = "FCFANS";
    pub const MINTEMP: &str = "MINTEMP";
    pub const MAXTEMP: &str = "MAXTEMP";
    pub const MINSTART: &str = "MINSTART";
    pub const MINSTOP: &str = "MINSTOP";
    pub const MINPWM: &str = "MINPWM";
    pub const MAXPWM: &str = "MAXPWM";
    pub const AVERAGE: &str = "AVERAGE";

    /// Keys in the order a freshly generated file lists them
    pub const KEY_ORDER: [&str; 12] = [
        INTERVAL, DEVPATH, DEVNAME, FCTEMPS, FCFANS, MINTEMP, MAXTEMP, MINSTART, MINSTOP,
        MINPWM, MAXPWM, AVERAGE,
    ];

    /// Header written at the top of a freshly generated file
    pub const HEADER: &str = "# Configuration file generated by fancontrol-gui, changes may be overwritten";

    /// Separator joining several fans in one FCFANS value
    pub const FAN_JOIN: char = '+';
}

/// Polling defaults
pub mod polling {
    /// Default polling interval in seconds (what pwmconfig writes)
    pub const DEFAULT_INTERVAL_SECS: i64 = 10;
}

/// Change notifications
pub mod events {
    /// Events buffered per subscriber before the slowest one starts lagging
    pub const CHANNEL_CAPACITY: usize = 256;
}

/// PWM constants
pub mod pwm {
    /// Minimum PWM duty
    pub const MIN_VALUE: i64 = 0;
    /// Maximum PWM duty
    pub const MAX_VALUE: i64 = 255;
    /// Default MAXPWM when the directive is omitted
    pub const DEFAULT_MAX_PWM: i64 = 255;
    /// Default MINPWM when the directive is omitted
    pub const DEFAULT_MIN_PWM: i64 = 0;
}

/// Temperature constants
pub mod temperature {
    /// Divisor to convert millidegrees to degrees Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;
}

/// Service collaborator defaults
pub mod service {
    /// Default daemon unit name (without `.service`)
    pub const DEFAULT_NAME: &str = "fancontrol";
    /// Suffix appended to unit names
    pub const UNIT_SUFFIX: &str = ".service";
    /// systemctl binary
    pub const SYSTEMCTL: &str = "systemctl";
    /// Privilege escalation helper
    pub const PKEXEC: &str = "pkexec";
    /// Message systemd prints when polkit authorization is required
    pub const AUTH_REQUIRED: &str = "Interactive authentication required";
}
