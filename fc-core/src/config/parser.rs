//! fancontrol file parser
//!
//! Line oriented and forgiving: anything it does not understand is kept
//! verbatim and reported as a warning, never an error.

use tracing::{debug, warn};

use crate::config::model::{ConfigLine, ConfigModel};
use crate::constants::fancontrol::{self, *};
use crate::data::{device_index, FanControl, SensorRef, SensorType};
use crate::error::FancontrolError;

/// Parse the text of a fancontrol file
pub fn parse(text: &str) -> ConfigModel {
    let mut model = ConfigModel::default();
    model.trailing_newline = text.ends_with('\n');

    let body = text.strip_suffix('\n').unwrap_or(text);
    if !text.is_empty() {
        for (idx, raw) in body.split('\n').enumerate() {
            let key = parse_line(&mut model, idx + 1, raw);
            model.lines.push(ConfigLine {
                raw: raw.to_string(),
                key,
            });
        }
    }

    model.capture_baseline();
    debug!(
        lines = model.lines.len(),
        controls = model.controls.len(),
        warnings = model.warnings.len(),
        "Parsed fancontrol configuration"
    );
    model
}

fn known_key(key: &str) -> Option<&'static str> {
    fancontrol::KEY_ORDER.iter().copied().find(|k| *k == key)
}

/// Interpret one line; returns the directive it owns
fn parse_line(model: &mut ConfigModel, line_no: usize, raw: &str) -> Option<&'static str> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let Some((key, value)) = line.split_once('=') else {
        warn_line(model, line_no, format!("not a KEY=value line: {:?}", line));
        return None;
    };

    let key = known_key(key.trim())?;
    if model.lines.iter().any(|l| l.key == Some(key)) {
        warn_line(model, line_no, format!("duplicate {} overrides the earlier one", key));
        reset_key(model, key);
    }

    apply(model, line_no, key, value.trim());
    Some(key)
}

fn warn_line(model: &mut ConfigModel, line_no: usize, reason: String) {
    warn!(line = line_no, "{}", reason);
    model.warnings.push(FancontrolError::parse(line_no, reason));
}

/// Forget values set by an earlier line of the same directive
fn reset_key(model: &mut ConfigModel, key: &'static str) {
    model.unparsed.remove(key);
    match key {
        INTERVAL => model.interval = None,
        DEVPATH => model.devpaths.clear(),
        DEVNAME => model.devnames.clear(),
        _ => {
            for control in model.controls.values_mut() {
                set_field(control, key, None);
            }
        }
    }
}

fn set_field(control: &mut FanControl, key: &str, value: Option<i64>) {
    match key {
        FCTEMPS => {
            if value.is_none() {
                control.temp = None;
            }
        }
        FCFANS => {
            if value.is_none() {
                control.fans.clear();
            }
        }
        MINTEMP => control.min_temp = value,
        MAXTEMP => control.max_temp = value,
        MINSTART => control.min_start = value,
        MINSTOP => control.min_stop = value,
        MINPWM => control.min_pwm = value,
        MAXPWM => control.max_pwm = value,
        AVERAGE => control.average = value,
        _ => {}
    }
}

fn apply(model: &mut ConfigModel, line_no: usize, key: &'static str, value: &str) {
    if key == INTERVAL {
        match value.parse::<i64>() {
            Ok(secs) if secs > 0 => model.interval = Some(secs),
            _ => warn_line(model, line_no, format!("invalid INTERVAL {:?}", value)),
        }
        return;
    }

    for pair in value.split_whitespace() {
        if let Err(reason) = apply_pair(model, key, pair) {
            warn_line(model, line_no, format!("{}: {} in {:?}", key, reason, pair));
            model.unparsed.entry(key).or_default().push(pair.to_string());
        }
    }
}

fn apply_pair(model: &mut ConfigModel, key: &'static str, pair: &str) -> Result<(), String> {
    let (left, right) = pair
        .split_once('=')
        .ok_or_else(|| "missing '='".to_string())?;

    match key {
        DEVPATH | DEVNAME => {
            if right.is_empty() {
                return Err("empty value".into());
            }
            let map = if key == DEVPATH {
                &mut model.devpaths
            } else {
                &mut model.devnames
            };
            map.insert(device_index(left), right.to_string());
            return Ok(());
        }
        _ => {}
    }

    let pwm = sensor_ref(left, SensorType::Pwm)?;
    match key {
        FCTEMPS => {
            let temp = sensor_ref(right, SensorType::Temperature)?;
            model.controls.entry(pwm).or_default().temp = Some(temp);
        }
        FCFANS => {
            let fans = right
                .split(FAN_JOIN)
                .map(|f| sensor_ref(f, SensorType::Fan))
                .collect::<Result<Vec<_>, _>>()?;
            model.controls.entry(pwm).or_default().fans = fans;
        }
        _ => {
            let v = right
                .parse::<i64>()
                .map_err(|_| format!("invalid number {:?}", right))?;
            set_field(model.controls.entry(pwm).or_default(), key, Some(v));
        }
    }
    Ok(())
}

fn sensor_ref(token: &str, expected: SensorType) -> Result<SensorRef, String> {
    match SensorRef::parse(token) {
        Some(r) if r.kind == expected => Ok(r),
        Some(r) => Err(format!("{} is a {} sensor, expected {}", token, r.kind, expected)),
        None => Err(format!("unrecognized sensor {:?}", token)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::STANDARD_CONFIG;

    #[test]
    fn test_parse_standard_config() {
        let m = parse(STANDARD_CONFIG);
        assert!(m.warnings.is_empty(), "{:?}", m.warnings);
        assert_eq!(m.interval, Some(10));
        assert_eq!(m.devnames.get(&1).map(String::as_str), Some("coretemp"));
        assert_eq!(m.devpaths.get(&0).map(String::as_str), Some("devices/platform/nct6775.0"));

        let c = m.control(SensorRef::pwm(0, 0)).unwrap();
        assert_eq!(c.temp, Some(SensorRef::temp(1, 0)));
        assert_eq!(c.fans, vec![SensorRef::fan(0, 0)]);
        assert_eq!((c.min_temp, c.max_temp), (Some(30), Some(70)));
        assert_eq!((c.min_start, c.min_stop), (Some(150), Some(40)));
        assert_eq!(c.max_pwm, None);
        assert_eq!(m.controls.len(), 2);
        assert_eq!(m.lines().len(), 10);
        assert!(m.lines()[0].key.is_none());
    }

    #[test]
    fn test_multiple_fans_per_output() {
        let m = parse("FCFANS=hwmon2/pwm1=hwmon2/fan1_input+hwmon2/fan3_input\n");
        let c = m.control(SensorRef::pwm(2, 0)).unwrap();
        assert_eq!(c.fans, vec![SensorRef::fan(2, 0), SensorRef::fan(2, 2)]);
    }

    #[test]
    fn test_malformed_lines_warn_and_continue() {
        let text = "INTERVAL=ten\nthis is not a directive\nMINTEMP=hwmon0/pwm1=x hwmon0/pwm2=40\nFOO=bar\n";
        let m = parse(text);
        assert_eq!(m.warnings.len(), 3);
        assert!(matches!(m.warnings[0], FancontrolError::Parse { line: 1, .. }));
        assert!(matches!(m.warnings[1], FancontrolError::Parse { line: 2, .. }));
        assert_eq!(m.interval, None);
        assert_eq!(m.control(SensorRef::pwm(0, 1)).and_then(|c| c.min_temp), Some(40));
        assert!(m.control(SensorRef::pwm(0, 0)).is_none());
        // Unknown directive: preserved, not interpreted
        assert_eq!(m.lines()[3].key, None);
        assert_eq!(m.unparsed.get(MINTEMP), Some(&vec!["hwmon0/pwm1=x".to_string()]));
    }

    #[test]
    fn test_out_of_range_sensor_number_is_kept() {
        let m = parse("FCTEMPS=hwmon0/pwm1=hwmon0/temp-2147483648_input
");
        let c = m.control(SensorRef::pwm(0, 0)).unwrap();
        assert_eq!(c.temp, Some(SensorRef::temp(0, i32::MIN)));
        assert!(m.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_key_drops_earlier_unparsed_pairs() {
        let m = parse("MAXTEMP=hwmon0/pwm1=hot\nMAXTEMP=hwmon0/pwm1=70\n");
        assert!(m.unparsed.get(MAXTEMP).is_none());
        assert_eq!(m.render_value(MAXTEMP).as_deref(), Some("hwmon0/pwm1=70"));
    }

    #[test]
    fn test_wrong_sensor_kind_is_rejected() {
        let m = parse("FCTEMPS=hwmon0/pwm1=hwmon0/fan1_input\n");
        assert_eq!(m.warnings.len(), 1);
        assert!(m.control(SensorRef::pwm(0, 0)).is_none());
    }

    #[test]
    fn test_duplicate_key_later_wins() {
        let m = parse("INTERVAL=10\nMINTEMP=hwmon0/pwm1=20 hwmon0/pwm2=25\nINTERVAL=4\nMINTEMP=hwmon0/pwm1=35\n");
        assert_eq!(m.interval, Some(4));
        assert_eq!(m.control(SensorRef::pwm(0, 0)).and_then(|c| c.min_temp), Some(35));
        assert_eq!(m.control(SensorRef::pwm(0, 1)).and_then(|c| c.min_temp), None);
        assert_eq!(m.warnings.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        let m = parse("");
        assert!(!m.is_fresh());
        assert!(m.lines().is_empty());
        assert!(m.warnings.is_empty());
        assert_eq!(m.interval, None);
    }
}
