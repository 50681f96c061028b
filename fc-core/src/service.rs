//! Service Management
//!
//! Lifecycle control of the fancontrol daemon through systemd. Requests are
//! typed and validated before anything is executed; `systemctl` is tried
//! first and `pkexec` is used when polkit demands interactive authorization.

use serde::{Deserialize, Serialize};
use std::process::{Command, Output};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::constants::service;
use crate::error::{FancontrolError, Result};
use crate::events::{Event, EventBus};

/// Append `.service` unless the name already carries a unit suffix
pub fn unit_name(name: &str) -> String {
    if name.ends_with(service::UNIT_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, service::UNIT_SUFFIX)
    }
}

fn is_safe_unit(unit: &str) -> bool {
    !unit.is_empty()
        && unit.len() <= 256
        && !unit.starts_with('-')
        && unit
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '@' | '-'))
}

/// One lifecycle action on a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServiceRequest {
    ReloadOrRestart { unit: String },
    Stop { unit: String },
    Enable { unit: String },
    Disable { unit: String },
    DaemonReload,
}

impl ServiceRequest {
    /// Name of the systemd manager method, used in status messages
    pub fn method(&self) -> &'static str {
        match self {
            ServiceRequest::ReloadOrRestart { .. } => "ReloadOrRestartUnit",
            ServiceRequest::Stop { .. } => "StopUnit",
            ServiceRequest::Enable { .. } => "EnableUnitFiles",
            ServiceRequest::Disable { .. } => "DisableUnitFiles",
            ServiceRequest::DaemonReload => "Reload",
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            ServiceRequest::ReloadOrRestart { unit }
            | ServiceRequest::Stop { unit }
            | ServiceRequest::Enable { unit }
            | ServiceRequest::Disable { unit } => Some(unit.as_str()),
            ServiceRequest::DaemonReload => None,
        }
    }

    /// Reject unit names that are not plain systemd unit names
    pub fn validate(&self) -> Result<()> {
        match self.unit() {
            Some(unit) if !is_safe_unit(unit) => Err(FancontrolError::InvalidServiceRequest(
                format!("{} is not a valid unit name", unit),
            )),
            _ => Ok(()),
        }
    }

    /// Arguments for `systemctl`
    pub fn systemctl_args(&self) -> Vec<String> {
        let verb = match self {
            ServiceRequest::ReloadOrRestart { .. } => "reload-or-restart",
            ServiceRequest::Stop { .. } => "stop",
            ServiceRequest::Enable { .. } => "enable",
            ServiceRequest::Disable { .. } => "disable",
            ServiceRequest::DaemonReload => "daemon-reload",
        };
        std::iter::once(verb.to_string())
            .chain(self.unit().map(str::to_string))
            .collect()
    }
}

/// Access to the service manager
#[cfg_attr(test, mockall::automock)]
pub trait ServiceManager: Send + Sync {
    /// Whether a unit file with this name is installed
    fn exists(&self, unit: &str) -> Result<bool>;
    fn is_active(&self, unit: &str) -> Result<bool>;
    fn is_enabled(&self, unit: &str) -> Result<bool>;
    /// Run a request; returns a status message on success
    fn execute(&self, request: &ServiceRequest) -> Result<String>;
}

/// systemd through `systemctl`
#[derive(Debug, Clone)]
pub struct SystemdManager {
    systemctl: String,
}

impl Default for SystemdManager {
    fn default() -> Self {
        Self {
            systemctl: service::SYSTEMCTL.to_string(),
        }
    }
}

impl SystemdManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn query(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.systemctl)
            .args(args)
            .output()
            .map_err(|e| FancontrolError::service(format!("Failed to run {}: {}", self.systemctl, e)))
    }

    fn state(&self, verb: &str, unit: &str) -> Result<String> {
        let output = self.query(&[verb, unit])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ServiceManager for SystemdManager {
    fn exists(&self, unit: &str) -> Result<bool> {
        let output = self.query(&["list-unit-files", "--no-legend", unit])?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(listing.lines().any(|l| l.split_whitespace().next() == Some(unit)))
    }

    fn is_active(&self, unit: &str) -> Result<bool> {
        Ok(self.state("is-active", unit)? == "active")
    }

    fn is_enabled(&self, unit: &str) -> Result<bool> {
        Ok(self.state("is-enabled", unit)? == "enabled")
    }

    fn execute(&self, request: &ServiceRequest) -> Result<String> {
        request.validate()?;
        let args = request.systemctl_args();
        debug!(method = request.method(), ?args, "Running service request");

        let output = Command::new(&self.systemctl)
            .args(&args)
            .output()
            .map_err(|e| FancontrolError::service(format!("Failed to run {}: {}", self.systemctl, e)))?;

        if output.status.success() {
            return Ok(format!("{} succeeded", request.method()));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains(service::AUTH_REQUIRED) && !is_root() {
            info!(method = request.method(), "Authorization required, retrying through pkexec");
            run_pkexec(&self.systemctl, &args)?;
            return Ok(format!("{} succeeded", request.method()));
        }

        Err(FancontrolError::service(stderr))
    }
}

fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

fn run_pkexec(program: &str, args: &[String]) -> Result<()> {
    let output = Command::new(service::PKEXEC)
        .arg(program)
        .args(args)
        .output()
        .map_err(|e| FancontrolError::PrivilegeEscalation(format!("Failed to run pkexec: {}", e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(FancontrolError::PrivilegeEscalation(format!(
            "Command failed: {}",
            stderr.trim()
        )))
    }
}

/// The daemon unit as the application sees it
#[derive(Clone)]
pub struct ServiceController {
    manager: Arc<dyn ServiceManager>,
    name: String,
}

impl std::fmt::Debug for ServiceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceController")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ServiceController {
    pub fn new(manager: Arc<dyn ServiceManager>, name: impl Into<String>) -> Self {
        Self {
            manager,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> String {
        unit_name(&self.name)
    }

    fn ensure_exists(&self) -> Result<()> {
        if self.manager.exists(&self.unit())? {
            Ok(())
        } else {
            Err(FancontrolError::service(format!(
                "Service {} doesn't exist",
                self.name
            )))
        }
    }

    /// Status line for the unit: "Success" when it is installed
    pub fn check(&self) -> Result<String> {
        self.ensure_exists()?;
        Ok("Success".to_string())
    }

    pub fn is_active(&self) -> Result<bool> {
        self.ensure_exists()?;
        self.manager.is_active(&self.unit())
    }

    pub fn is_enabled(&self) -> Result<bool> {
        self.ensure_exists()?;
        self.manager.is_enabled(&self.unit())
    }

    /// Start (reload-or-restart) or stop the daemon if it is not already in
    /// the requested state
    pub fn set_active(&self, active: bool) -> Result<String> {
        if self.is_active()? == active {
            debug!(service = %self.name, active, "Service already in requested state");
            return Ok(format!("Service {} already {}", self.name, if active { "active" } else { "inactive" }));
        }
        let unit = self.unit();
        let request = if active {
            ServiceRequest::ReloadOrRestart { unit }
        } else {
            ServiceRequest::Stop { unit }
        };
        self.manager.execute(&request)
    }

    /// Enable or disable the unit, then reload the manager configuration
    pub fn set_enabled(&self, enabled: bool) -> Result<String> {
        if self.is_enabled()? == enabled {
            return Ok(format!(
                "Service {} already {}",
                self.name,
                if enabled { "enabled" } else { "disabled" }
            ));
        }
        let unit = self.unit();
        let request = if enabled {
            ServiceRequest::Enable { unit }
        } else {
            ServiceRequest::Disable { unit }
        };
        let message = self.manager.execute(&request)?;
        self.manager.execute(&ServiceRequest::DaemonReload)?;
        Ok(message)
    }

    /// Reload or restart the daemon so it picks up a new configuration
    pub fn restart(&self) -> Result<String> {
        self.ensure_exists()?;
        self.manager.execute(&ServiceRequest::ReloadOrRestart { unit: self.unit() })
    }

    /// [`restart`](Self::restart) on a worker thread; the outcome is
    /// published as [`Event::ServiceFinished`]
    pub fn restart_detached(&self, bus: EventBus) -> thread::JoinHandle<()> {
        let controller = self.clone();
        thread::spawn(move || {
            let outcome = controller.restart().map_err(|e| {
                warn!(service = %controller.name, error = %e, "Service restart failed");
                e.to_string()
            });
            bus.publish(Event::ServiceFinished {
                method: "ReloadOrRestartUnit".to_string(),
                outcome,
            });
        })
    }
}
