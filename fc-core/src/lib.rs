//! fancontrol-gui Core Library
//!
//! Hardware discovery, sensor polling and lm-sensors `fancontrol`
//! configuration handling for the fancontrol-gui front ends.
//!
//! # Features
//!
//! - **Hardware Discovery**: Enumeration of hwmon devices and their temperature, fan and PWM files
//! - **Polling**: Periodic sensor refresh on a single tokio task with a reconfigurable interval
//! - **Configuration**: Lossless parsing and rewriting of `/etc/fancontrol`
//! - **Service**: Lifecycle control of the fancontrol systemd unit
//!
//! # Module Structure
//!
//! - `hw/` - Hardware interaction (discovery)
//! - `data/` - Identifiers, sensors, devices, fan-control settings
//! - `config/` - fancontrol file model, parser, writer, reconciliation
//! - `engine/` - Observable loader and polling loop
//!
//! # Example
//!
//! ```no_run
//! use fc_core::{AppContext, AppSettings};
//!
//! # async fn run() -> fc_core::Result<()> {
//! let ctx = AppContext::new(AppSettings::default());
//! ctx.bootstrap()?;
//! let handle = ctx.start().await?;
//! handle.set_interval(5).await?;
//! # Ok(())
//! # }
//! ```

// Grouped modules
pub mod config;
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod context;
pub mod events;
pub mod service;
pub mod settings;

#[cfg(test)]
mod test_utils;

/// Error types shared by every fancontrol-gui crate
pub mod error {
    pub use fc_error::*;
}

// Re-export error types
pub use error::{FancontrolError, Result};

// Re-export primary types from data/
pub use data::{
    device_index, find_sensor, parse_identifier, sensor_index, FanControl, FanLimits, Hwmon,
    PwmState, Sensor, SensorKind, SensorRef, SensorType, TempLimits,
};

// Re-export configuration handling
pub use config::{load as load_config, parse as parse_config, render as render_config, ConfigModel};

// Re-export engine types
pub use engine::{Loader, LoopHandle, LoopState, SharedLoader};

// Re-export hardware functions from hw/
pub use hw::{discover, Discovery};

pub use context::AppContext;
pub use events::{Event, EventBus, Subscription};
pub use service::{ServiceController, ServiceManager, ServiceRequest, SystemdManager};
pub use settings::{get_settings_path, load_settings, load_settings_from, save_settings, AppSettings};
