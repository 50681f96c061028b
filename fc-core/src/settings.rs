//! Application Settings
//!
//! Persistent settings stored as JSON in ~/.config/fancontrol-gui/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::write_atomic;
use crate::constants::{paths, service};
use crate::error::{FancontrolError, Result};

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory holding the `hwmonN` device directories
    #[serde(default = "default_hwmon_root")]
    pub hwmon_root: PathBuf,

    /// fancontrol configuration file opened at startup
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// systemd unit running fancontrol (without `.service`)
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Reload the daemon after every successful save
    #[serde(default)]
    pub restart_on_save: bool,
}

fn default_hwmon_root() -> PathBuf {
    PathBuf::from(paths::HWMON_BASE)
}
fn default_config_path() -> PathBuf {
    PathBuf::from(paths::FANCONTROL_CONFIG)
}
fn default_service_name() -> String {
    service::DEFAULT_NAME.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hwmon_root: default_hwmon_root(),
            config_path: default_config_path(),
            service_name: default_service_name(),
            restart_on_save: false,
        }
    }
}

impl AppSettings {
    /// Sanity checks applied after loading
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty()
            || !self
                .service_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        {
            return Err(FancontrolError::config(format!(
                "Invalid service name {:?}",
                self.service_name
            )));
        }
        if self.config_path.as_os_str().is_empty() {
            return Err(FancontrolError::config("Configuration path is empty"));
        }
        Ok(())
    }
}

/// Get the settings file path, creating its directory if needed
pub fn get_settings_path() -> Result<PathBuf> {
    let dir = paths::user_config_dir()
        .ok_or_else(|| FancontrolError::config("Could not determine config directory"))?;

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            FancontrolError::config(format!("Failed to create config directory: {}", e))
        })?;
    }

    Ok(dir.join(paths::SETTINGS_FILE))
}

/// Load settings from the user's config directory
pub fn load_settings() -> Result<AppSettings> {
    load_settings_from(&get_settings_path()?)
}

/// Load settings from a specific file; a missing file yields defaults
pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    if !path.exists() {
        debug!(path = ?path, "No settings file, using defaults");
        return Ok(AppSettings::default());
    }

    let content = fs::read_to_string(path).map_err(|e| FancontrolError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let settings: AppSettings = serde_json::from_str(&content)?;
    if let Err(e) = settings.validate() {
        warn!(path = ?path, error = %e, "Ignoring invalid settings");
        return Ok(AppSettings::default());
    }
    Ok(settings)
}

/// Save settings to JSON file
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(&get_settings_path()?, settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    settings.validate()?;
    let json = serde_json::to_string_pretty(settings)?;
    write_atomic(path, &json)
}

/// Update a single setting value and save
pub fn update_setting<F>(updater: F) -> Result<AppSettings>
where
    F: FnOnce(&mut AppSettings),
{
    let mut settings = load_settings()?;
    updater(&mut settings);
    save_settings(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard(Option<String>);

    impl EnvGuard {
        fn set(dir: &Path) -> Self {
            let old = std::env::var(paths::CONFIG_DIR_ENV).ok();
            std::env::set_var(paths::CONFIG_DIR_ENV, dir);
            Self(old)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(v) => std::env::set_var(paths::CONFIG_DIR_ENV, v),
                None => std::env::remove_var(paths::CONFIG_DIR_ENV),
            }
        }
    }

    #[test]
    fn test_defaults() {
        let s = AppSettings::default();
        assert_eq!(s.hwmon_root, PathBuf::from("/sys/class/hwmon"));
        assert_eq!(s.config_path, PathBuf::from("/etc/fancontrol"));
        assert_eq!(s.service_name, "fancontrol");
        assert!(!s.restart_on_save);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"restart_on_save": true}"#).unwrap();
        assert!(s.restart_on_save);
        assert_eq!(s.service_name, "fancontrol");
    }

    #[test]
    fn test_validate_rejects_odd_service_names() {
        let mut s = AppSettings::default();
        s.service_name = "fan control; reboot".into();
        assert!(s.validate().is_err());
        s.service_name = "fancontrol@1".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_save_and_load_via_env_dir() {
        let dir = TempDir::new().unwrap();
        let _guard = EnvGuard::set(dir.path());

        let path = get_settings_path().unwrap();
        assert_eq!(path, dir.path().join("settings.json"));
        assert_eq!(load_settings().unwrap(), AppSettings::default());

        let updated = update_setting(|s| s.service_name = "fancontrol-custom".into()).unwrap();
        assert_eq!(load_settings().unwrap(), updated);
        assert!(fs::read_to_string(&path).unwrap().contains("fancontrol-custom"));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"service_name": ""}"#).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), AppSettings::default());

        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(FancontrolError::Json(_))));
    }
}
