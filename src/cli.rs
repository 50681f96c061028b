/*
 * This file is part of fancontrol-gui.
 *
 * Copyright (C) 2025 fancontrol-gui contributors
 *
 * fancontrol-gui is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 2 of the License, or
 * (at your option) any later version.
 *
 * fancontrol-gui is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with fancontrol-gui. If not, see <https://www.gnu.org/licenses/>.
 */

//! Command Line Interface
//!
//! Flags override the persisted settings for one run.

use clap::{Args, Parser, Subcommand};
use fc_core::AppSettings;
use std::path::PathBuf;

/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "FANCONTROL_GUI_LOG";

#[derive(Parser, Debug)]
#[command(name = "fancontrol-gui")]
#[command(version)]
#[command(about = "Sensor browser and fancontrol configuration editor")]
#[command(long_about = "fancontrol-gui - Sensor browser and fancontrol configuration editor

Discovers hwmon devices, polls their sensors and keeps an lm-sensors
fancontrol configuration in sync with the hardware.

EXAMPLES:
    fancontrol-gui                         Poll sensors until interrupted
    fancontrol-gui --once                  Read every sensor once and exit
    fancontrol-gui --interval 5 --save     Change INTERVAL and write the file
    fancontrol-gui show                    Print the configuration as it would be saved
    fancontrol-gui service status          Query the fancontrol unit

ENVIRONMENT VARIABLES:
    FANCONTROL_GUI_LOG=debug               Tracing filter (default: info)
    FANCONTROL_GUI_CONFIG_DIR=DIR          Settings directory override

FILES:
    ~/.config/fancontrol-gui/settings.json Application settings
    /etc/fancontrol                        fancontrol configuration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory containing the hwmonN device directories
    #[arg(long, value_name = "DIR", global = true)]
    pub hwmon_root: Option<PathBuf>,

    /// fancontrol configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Polling interval in seconds
    #[arg(short, long, value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Read every sensor once, print them and exit
    #[arg(long)]
    pub once: bool,

    /// Write the configuration file before polling
    #[arg(long)]
    pub save: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll sensors until interrupted (default)
    Run,

    /// Discovered devices, sensors and configured outputs
    Status,

    /// Print the configuration text as it would be saved
    Show,

    /// fancontrol service management
    #[command(subcommand)]
    Service(ServiceCommands),

    /// Settings management
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommands {
    /// Show whether the unit exists, is active and is enabled
    Status,
    /// Reload or restart the unit
    Start,
    /// Stop the unit
    Stop,
    /// Reload or restart so the daemon rereads its configuration
    Restart,
    /// Enable the unit at boot
    Enable,
    /// Disable the unit at boot
    Disable,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommands {
    /// Show all settings as JSON
    Show,
    /// Print the settings file path
    Path,
    /// Set a setting and save
    Set(SetArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SetArgs {
    /// One of hwmon_root, config_path, service_name, restart_on_save
    pub key: String,
    pub value: String,
}

impl Cli {
    /// The subcommand to run; no subcommand means `run`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// Apply path overrides on top of persisted settings
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(root) = &self.hwmon_root {
            settings.hwmon_root = root.clone();
        }
        if let Some(config) = &self.config {
            settings.config_path = config.clone();
        }
    }

    /// Tracing filter: verbosity flags win over the environment
    pub fn log_filter(&self, env: Option<&str>) -> String {
        match self.verbose {
            0 => env
                .filter(|s| !s.is_empty())
                .unwrap_or("info")
                .to_string(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

/// Assign a settings key from its string form
pub fn set_setting(settings: &mut AppSettings, key: &str, value: &str) -> Result<(), String> {
    match key {
        "hwmon_root" => settings.hwmon_root = PathBuf::from(value),
        "config_path" => settings.config_path = PathBuf::from(value),
        "service_name" => settings.service_name = value.to_string(),
        "restart_on_save" => {
            settings.restart_on_save = value
                .parse()
                .map_err(|_| format!("Expected true or false, got {:?}", value))?;
        }
        _ => return Err(format!("Unknown setting {:?}", key)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fancontrol-gui").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_to_run() {
        let cli = parse(&[]);
        assert_eq!(cli.command(), Commands::Run);
        assert!(!cli.once);
        assert_eq!(cli.interval, None);
    }

    #[test]
    fn test_negative_interval_reaches_core() {
        let cli = parse(&["--interval", "-5", "--once"]);
        assert_eq!(cli.interval, Some(-5));
        assert!(cli.once);
    }

    #[test]
    fn test_overrides_apply() {
        let cli = parse(&["--hwmon-root", "/tmp/hw", "status", "-c", "/tmp/fc"]);
        let mut settings = AppSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.hwmon_root, PathBuf::from("/tmp/hw"));
        assert_eq!(settings.config_path, PathBuf::from("/tmp/fc"));
        assert_eq!(cli.command(), Commands::Status);
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&[]).log_filter(None), "info");
        assert_eq!(parse(&[]).log_filter(Some("fc_core=trace")), "fc_core=trace");
        assert_eq!(parse(&["-v"]).log_filter(Some("warn")), "debug");
        assert_eq!(parse(&["-vv"]).log_filter(None), "trace");
    }

    #[test]
    fn test_set_setting() {
        let mut s = AppSettings::default();
        set_setting(&mut s, "restart_on_save", "true").unwrap();
        set_setting(&mut s, "service_name", "fancontrol@1").unwrap();
        assert!(s.restart_on_save);
        assert_eq!(s.service_name, "fancontrol@1");
        assert!(set_setting(&mut s, "restart_on_save", "yes").is_err());
        assert!(set_setting(&mut s, "colour", "blue").is_err());
    }

    #[test]
    fn test_service_subcommand() {
        let cli = parse(&["service", "enable"]);
        assert_eq!(cli.command(), Commands::Service(ServiceCommands::Enable));
    }
}
