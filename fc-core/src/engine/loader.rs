//! The observable model
//!
//! [`Loader`] owns the discovered devices, the parsed configuration, the
//! rendered configuration text and the current error string. Every mutation
//! publishes an [`Event`] after the state has changed, so observers reading
//! the loader in response always see the new values.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{self, ConfigModel};
use crate::data::{find_sensor, find_sensor_mut, FanControl, Hwmon, Sensor, SensorRef};
use crate::error::{FancontrolError, Result};
use crate::events::{Event, EventBus, Subscription};
use crate::hw;
use crate::service::ServiceController;

/// Loader shared between the polling task (writer) and readers
pub type SharedLoader = Arc<RwLock<Loader>>;

fn join_errors<'a>(errors: impl Iterator<Item = &'a FancontrolError>) -> String {
    errors.map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

#[derive(Debug)]
pub struct Loader {
    hwmon_root: PathBuf,
    hwmons: Vec<Hwmon>,
    model: ConfigModel,
    config_path: Option<PathBuf>,
    config_file: String,
    /// Composed from the three parts below
    error: String,
    /// Discovery errors, parse warnings and reconcile issues, recomputed
    /// whenever the model is reattached
    issues: String,
    discovery_error: String,
    /// Outcome of the last failed operation; cleared when one succeeds
    last_error: String,
    /// Read failures of the latest polling tick
    tick_error: String,
    tick: u64,
    service: Option<ServiceController>,
    bus: EventBus,
}

impl Loader {
    pub fn new(hwmon_root: impl Into<PathBuf>, bus: EventBus) -> Self {
        let model = ConfigModel::new();
        let config_file = config::render(&model);
        Self {
            hwmon_root: hwmon_root.into(),
            hwmons: Vec::new(),
            model,
            config_path: None,
            config_file,
            error: String::new(),
            issues: String::new(),
            discovery_error: String::new(),
            last_error: String::new(),
            tick_error: String::new(),
            tick: 0,
            service: None,
            bus,
        }
    }

    pub fn shared(self) -> SharedLoader {
        Arc::new(RwLock::new(self))
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn hwmons(&self) -> &[Hwmon] {
        &self.hwmons
    }

    pub fn sensor(&self, r: SensorRef) -> Option<&Sensor> {
        find_sensor(&self.hwmons, r)
    }

    /// Polling interval in seconds
    pub fn interval(&self) -> i64 {
        self.model.interval_secs()
    }

    /// Empty when healthy
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Configuration text as it would be written
    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn model(&self) -> &ConfigModel {
        &self.model
    }

    pub fn hwmon_root(&self) -> &Path {
        &self.hwmon_root
    }

    /// Number of completed polling ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Service to reload after every successful save
    pub fn set_service(&mut self, service: Option<ServiceController>) {
        self.service = service;
    }

    fn publish_error(&mut self) {
        let error = [&self.issues, &self.last_error, &self.tick_error]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if error != self.error {
            self.error = error;
            self.bus.publish(Event::ErrorChanged(self.error.clone()));
        }
    }

    fn report(&mut self, e: FancontrolError) -> FancontrolError {
        warn!(error = %e, "Operation failed");
        self.last_error = e.to_string();
        self.publish_error();
        e
    }

    fn succeeded(&mut self) {
        if !self.last_error.is_empty() {
            self.last_error.clear();
            self.publish_error();
        }
    }

    /// Reattach the model and recompute the persistent issues
    fn reconcile(&mut self) -> config::Reconciliation {
        let reconciled = config::reconcile(&self.model, &mut self.hwmons);
        let parts = [
            self.discovery_error.clone(),
            join_errors(self.model.warnings.iter()),
            join_errors(reconciled.issues.iter()),
        ];
        self.issues = parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        reconciled
    }

    /// Replace every device with a fresh scan of the hwmon root and
    /// reattach the configuration. Returns the number of devices.
    pub fn parse_hwmons(&mut self) -> usize {
        // Pending edits would die with the old sensors
        config::absorb_edits(&mut self.model, &mut self.hwmons);

        let found = hw::discover(&self.hwmon_root);
        self.discovery_error = found.error_message().unwrap_or_default();
        self.hwmons = found.hwmons;
        let reconciled = self.reconcile();

        info!(
            root = ?self.hwmon_root,
            devices = self.hwmons.len(),
            attached = reconciled.attached,
            "Hardware discovered"
        );
        self.bus.publish(Event::HwmonsChanged);
        self.tick_error.clear();
        self.publish_error();
        self.hwmons.len()
    }

    /// Re-read every sensor value. Returns how many values changed.
    pub fn update_sensors(&mut self) -> usize {
        let mut changed = 0;
        let mut failures = Vec::new();
        for hwmon in &mut self.hwmons {
            let report = hwmon.update_sensors();
            changed += report.changed;
            failures.extend(report.failures.into_iter().map(|(_, e)| e));
        }
        self.tick += 1;
        self.bus.publish(Event::SensorsUpdated {
            tick: self.tick,
            changed,
        });

        let tick_error = join_errors(failures.iter());
        if tick_error != self.tick_error {
            self.tick_error = tick_error;
            self.publish_error();
        }
        changed
    }

    /// Open and reconcile a configuration file. On failure the current
    /// model is kept.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let model = config::load(path).map_err(|e| self.report(e))?;
        let previous_interval = self.interval();

        config::absorb_edits(&mut self.model, &mut self.hwmons);
        self.model = model;
        let reconciled = self.reconcile();

        self.config_path = Some(path.to_path_buf());
        self.bus
            .publish(Event::ConfigPathChanged(self.config_path.clone()));
        if self.interval() != previous_interval {
            self.bus.publish(Event::IntervalChanged(self.interval()));
        }
        self.config_file = config::render(&self.model);
        self.bus.publish(Event::ConfigFileChanged);

        info!(
            path = ?path,
            controls = self.model.controls.len(),
            orphans = reconciled.orphans.len(),
            "Opened fancontrol configuration"
        );

        self.last_error.clear();
        self.publish_error();
        Ok(())
    }

    /// Absorb pending edits and regenerate the configuration text
    pub fn create_config_file(&mut self) -> &str {
        if config::absorb_edits(&mut self.model, &mut self.hwmons) > 0 {
            self.reconcile();
            self.publish_error();
        }
        let text = config::render(&self.model);
        if text != self.config_file {
            self.config_file = text;
            self.bus.publish(Event::ConfigFileChanged);
        }
        &self.config_file
    }

    /// Write the configuration to `path`, or to the open file when `None`.
    /// Returns the path written.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let target = path.map(Path::to_path_buf).or_else(|| self.config_path.clone());
        let Some(target) = target else {
            return Err(self.report(FancontrolError::config("No configuration file selected")));
        };

        self.create_config_file();
        config::write_atomic(&target, &self.config_file).map_err(|e| self.report(e))?;
        info!(path = ?target, "Saved fancontrol configuration");

        if self.config_path.as_deref() != Some(target.as_path()) {
            self.config_path = Some(target.clone());
            self.bus
                .publish(Event::ConfigPathChanged(self.config_path.clone()));
        }
        self.bus.publish(Event::ConfigSaved(target.clone()));
        self.succeeded();

        if let Some(service) = &self.service {
            service.restart_detached(self.bus.clone());
        }
        Ok(target)
    }

    /// Change the polling interval.
    ///
    /// A non-positive value is rejected before anything changes. Setting the
    /// current value does nothing. Otherwise the configuration text is
    /// regenerated and, when a file is open, written. Returns whether the
    /// interval changed.
    pub fn set_interval(&mut self, secs: i64) -> Result<bool> {
        if secs <= 0 {
            return Err(self.report(FancontrolError::InvalidInterval(secs)));
        }
        if secs == self.interval() {
            debug!(secs, "Interval unchanged");
            return Ok(false);
        }

        self.model.set_interval(secs)?;
        info!(secs, "Polling interval changed");
        self.bus.publish(Event::IntervalChanged(secs));
        self.create_config_file();

        if let Some(path) = self.config_path.clone() {
            // The new interval stands even if the file cannot be written
            if let Err(e) = config::write_atomic(&path, &self.config_file) {
                self.report(e);
                return Ok(true);
            }
        }
        self.succeeded();
        Ok(true)
    }

    /// Replace the fan-control settings of a PWM output.
    ///
    /// Settings that fail validation are still applied; the problems are
    /// reported through [`Loader::error`].
    pub fn set_control(&mut self, pwm: SensorRef, control: Option<FanControl>) -> Result<()> {
        let issues = control.as_ref().map(FanControl::validate).unwrap_or_default();
        let Some(sensor) = find_sensor_mut(&mut self.hwmons, pwm) else {
            return Err(self.report(FancontrolError::UnresolvedReference {
                reference: pwm.token(),
            }));
        };
        sensor.set_control(control).map_err(|e| self.report(e))?;

        if issues.is_empty() {
            self.succeeded();
        } else {
            self.report(FancontrolError::config(format!("{}: {}", pwm, issues.join(", "))));
        }
        Ok(())
    }

    pub fn clear_control(&mut self, pwm: SensorRef) -> Result<()> {
        self.set_control(pwm, None)
    }
}
