//! Matching configuration against discovered hardware
//!
//! Controls are joined to sensors by `(device_index, kind, sensor_index)`.
//! A control whose output is not present stays in the model as an orphan
//! so that saving never loses it.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::config::model::ConfigModel;
use crate::data::{find_hwmon, find_sensor, find_sensor_mut, Hwmon, SensorKind, SensorRef};
use crate::error::FancontrolError;

/// Outcome of [`reconcile`]
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Controls attached to a discovered PWM output
    pub attached: usize,
    /// Outputs referenced by the file that were not discovered
    pub orphans: Vec<SensorRef>,
    /// Unresolved references and stale device identities
    pub issues: Vec<FancontrolError>,
}

/// Attach the model's controls to the PWM sensors of `hwmons`.
///
/// Any control previously attached to an output is replaced, so running it
/// again after opening another file leaves no leftovers.
pub fn reconcile(model: &ConfigModel, hwmons: &mut [Hwmon]) -> Reconciliation {
    let mut result = Reconciliation::default();

    for pwm in hwmons.iter_mut().flat_map(|h| h.pwms.iter_mut()) {
        pwm.attach_control(None);
    }

    for (pwm, control) in &model.controls {
        for source in control.sources() {
            if find_sensor(hwmons, source).is_none() {
                warn!(output = %pwm, source = %source, "Control refers to a missing sensor");
                result.issues.push(FancontrolError::UnresolvedReference {
                    reference: source.token(),
                });
            }
        }

        match find_sensor_mut(hwmons, *pwm) {
            Some(sensor) => {
                sensor.attach_control(Some(control.clone()));
                result.attached += 1;
            }
            None => {
                warn!(output = %pwm, "Keeping control for an output that was not discovered");
                result.orphans.push(*pwm);
                result.issues.push(FancontrolError::UnresolvedReference {
                    reference: pwm.token(),
                });
            }
        }
    }

    check_identity(model, hwmons, &mut result.issues);

    debug!(
        attached = result.attached,
        orphans = result.orphans.len(),
        issues = result.issues.len(),
        "Reconciled configuration with hardware"
    );
    result
}

/// Compare DEVNAME and DEVPATH with what discovery found
fn check_identity(model: &ConfigModel, hwmons: &[Hwmon], issues: &mut Vec<FancontrolError>) {
    for (index, name) in &model.devnames {
        match find_hwmon(hwmons, *index) {
            None => issues.push(FancontrolError::config(format!(
                "stale configuration: DEVNAME lists hwmon{} which does not exist",
                index
            ))),
            Some(h) if h.name != *name => issues.push(FancontrolError::config(format!(
                "stale configuration: DEVNAME says hwmon{} is {} but it is {}",
                index, name, h.name
            ))),
            Some(_) => {}
        }
    }

    for (index, path) in &model.devpaths {
        let found = find_hwmon(hwmons, *index).and_then(|h| h.device_path.as_deref());
        if let Some(actual) = found {
            if actual != path {
                issues.push(FancontrolError::config(format!(
                    "stale configuration: DEVPATH says hwmon{} is {} but it is {}",
                    index, path, actual
                )));
            }
        }
    }
}

/// Move edited controls from dirty PWM sensors into the model.
///
/// Returns how many outputs were absorbed; their sensors are clean afterwards.
/// Devices that an absorbed control touches get a DEVNAME and DEVPATH entry
/// when the file has none for them yet.
pub fn absorb_edits(model: &mut ConfigModel, hwmons: &mut [Hwmon]) -> usize {
    let mut absorbed = 0;
    let mut touched = BTreeSet::new();
    for sensor in hwmons.iter_mut().flat_map(|h| h.pwms.iter_mut()) {
        if !sensor.dirty {
            continue;
        }
        let reference = sensor.reference();
        match &sensor.kind {
            SensorKind::Pwm(state) => match &state.control {
                Some(control) => {
                    touched.insert(reference.device_index);
                    touched.extend(control.sources().map(|r| r.device_index));
                    model.set_control(reference, control.clone());
                }
                None => {
                    model.remove_control(reference);
                }
            },
            _ => continue,
        }
        sensor.dirty = false;
        absorbed += 1;
    }
    if absorbed > 0 {
        add_identity(model, hwmons, &touched);
        debug!(outputs = absorbed, "Absorbed control edits");
    }
    absorbed
}

/// Fill in missing DEVNAME and DEVPATH entries for discovered `devices`.
/// Existing entries are never replaced, a mismatch stays visible as a
/// stale-configuration issue.
fn add_identity(model: &mut ConfigModel, hwmons: &[Hwmon], devices: &BTreeSet<i32>) {
    for &index in devices {
        let Some(h) = find_hwmon(hwmons, index) else {
            continue;
        };
        model.devnames.entry(index).or_insert_with(|| h.name.clone());
        if let Some(path) = &h.device_path {
            model.devpaths.entry(index).or_insert_with(|| path.clone());
        }
    }
}
