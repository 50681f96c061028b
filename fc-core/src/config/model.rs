//! In-memory fancontrol configuration
//!
//! Holds both the interpreted settings and the original lines of the file, so
//! that writing back only touches what actually changed.

use std::collections::BTreeMap;

use crate::constants::{fancontrol, polling};
use crate::data::{FanControl, SensorRef};
use crate::error::{FancontrolError, Result};

/// One line of the file as read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    /// Exact text without the line terminator
    pub raw: String,
    /// Known directive this line defines; `None` for comments, blank lines,
    /// unknown directives and malformed lines
    pub key: Option<&'static str>,
}

/// Parsed fancontrol configuration
#[derive(Debug, Default)]
pub struct ConfigModel {
    /// Polling period in seconds (`INTERVAL`)
    pub interval: Option<i64>,
    /// Device index to `/sys`-relative device path (`DEVPATH`)
    pub devpaths: BTreeMap<i32, String>,
    /// Device index to chip name (`DEVNAME`)
    pub devnames: BTreeMap<i32, String>,
    /// Per PWM output settings, including orphans
    pub controls: BTreeMap<SensorRef, FanControl>,
    /// Problems met while parsing
    pub warnings: Vec<FancontrolError>,
    /// Pairs of each directive that could not be interpreted, in file order.
    /// They are written back after the interpreted pairs.
    pub(crate) unparsed: BTreeMap<&'static str, Vec<String>>,
    pub(crate) lines: Vec<ConfigLine>,
    /// Rendering of each key right after parsing, used to detect edits
    pub(crate) baseline: BTreeMap<&'static str, Option<String>>,
    pub(crate) trailing_newline: bool,
    fresh: bool,
}

impl ConfigModel {
    /// A model with nothing read from disk; it renders with a header
    pub fn new() -> Self {
        Self {
            interval: Some(polling::DEFAULT_INTERVAL_SECS),
            trailing_newline: true,
            fresh: true,
            ..Self::default()
        }
    }

    /// True when the model was not read from a file
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    /// Effective polling period in seconds
    pub fn interval_secs(&self) -> i64 {
        self.interval.unwrap_or(polling::DEFAULT_INTERVAL_SECS)
    }

    pub fn set_interval(&mut self, secs: i64) -> Result<()> {
        if secs <= 0 {
            return Err(FancontrolError::InvalidInterval(secs));
        }
        self.interval = Some(secs);
        Ok(())
    }

    pub fn control(&self, pwm: SensorRef) -> Option<&FanControl> {
        self.controls.get(&pwm)
    }

    pub fn set_control(&mut self, pwm: SensorRef, control: FanControl) {
        self.controls.insert(pwm, control);
    }

    pub fn remove_control(&mut self, pwm: SensorRef) -> Option<FanControl> {
        self.controls.remove(&pwm)
    }

    /// Canonical value of one directive, `None` when it would be empty
    pub fn render_value(&self, key: &str) -> Option<String> {
        let kept = self.unparsed.get(key).filter(|pairs| !pairs.is_empty());
        match (self.render_known(key), kept) {
            (known, None) => known,
            (None, Some(pairs)) => Some(pairs.join(" ")),
            (Some(known), Some(pairs)) => Some(format!("{} {}", known, pairs.join(" "))),
        }
    }

    fn render_known(&self, key: &str) -> Option<String> {
        use crate::constants::fancontrol::*;

        match key {
            INTERVAL => self.interval.map(|i| i.to_string()),
            DEVPATH => join_pairs(self.devpaths.iter().map(|(i, p)| (device_token(*i), p.clone()))),
            DEVNAME => join_pairs(self.devnames.iter().map(|(i, n)| (device_token(*i), n.clone()))),
            FCTEMPS => self.render_controls(|c| c.temp.map(|t| t.token())),
            FCFANS => self.render_controls(|c| {
                if c.fans.is_empty() {
                    None
                } else {
                    Some(
                        c.fans
                            .iter()
                            .map(SensorRef::token)
                            .collect::<Vec<_>>()
                            .join(FAN_JOIN.to_string().as_str()),
                    )
                }
            }),
            MINTEMP => self.render_controls(|c| c.min_temp.map(|v| v.to_string())),
            MAXTEMP => self.render_controls(|c| c.max_temp.map(|v| v.to_string())),
            MINSTART => self.render_controls(|c| c.min_start.map(|v| v.to_string())),
            MINSTOP => self.render_controls(|c| c.min_stop.map(|v| v.to_string())),
            MINPWM => self.render_controls(|c| c.min_pwm.map(|v| v.to_string())),
            MAXPWM => self.render_controls(|c| c.max_pwm.map(|v| v.to_string())),
            AVERAGE => self.render_controls(|c| c.average.map(|v| v.to_string())),
            _ => None,
        }
    }

    fn render_controls<F>(&self, value: F) -> Option<String>
    where
        F: Fn(&FanControl) -> Option<String>,
    {
        join_pairs(
            self.controls
                .iter()
                .filter_map(|(pwm, c)| value(c).map(|v| (pwm.token(), v))),
        )
    }

    /// Snapshot every key's rendering; subsequent edits are measured against it
    pub(crate) fn capture_baseline(&mut self) {
        self.baseline = fancontrol::KEY_ORDER
            .iter()
            .map(|key| (*key, self.render_value(key)))
            .collect();
    }

    /// Whether the directive differs from what was read
    pub fn is_changed(&self, key: &'static str) -> bool {
        match self.baseline.get(key) {
            Some(before) => *before != self.render_value(key),
            None => self.render_value(key).is_some(),
        }
    }
}

fn device_token(index: i32) -> String {
    format!("{}{}", crate::constants::sysfs::DEVICE_PREFIX, index)
}

fn join_pairs(pairs: impl Iterator<Item = (String, String)>) -> Option<String> {
    let rendered: Vec<String> = pairs.map(|(k, v)| format!("{}={}", k, v)).collect();
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(" "))
    }
}
