//! Fan-control settings for one PWM output
//!
//! These are the per-output directives of a fancontrol file (`FCTEMPS`,
//! `FCFANS`, `MINTEMP`, ...). A setting that is absent from the file stays
//! `None` so that serialization never invents values the user did not write.

use serde::{Deserialize, Serialize};

use crate::constants::pwm;
use crate::data::identifier::SensorRef;

/// Settings fancontrol applies to one PWM output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanControl {
    /// Temperature sensor driving this output (`FCTEMPS`)
    pub temp: Option<SensorRef>,
    /// Fans whose speed reflects this output (`FCFANS`)
    pub fans: Vec<SensorRef>,
    /// Degrees Celsius below which the fan idles (`MINTEMP`)
    pub min_temp: Option<i64>,
    /// Degrees Celsius at which the fan runs at full duty (`MAXTEMP`)
    pub max_temp: Option<i64>,
    /// Duty needed to spin a stopped fan up (`MINSTART`)
    pub min_start: Option<i64>,
    /// Lowest duty that keeps the fan spinning (`MINSTOP`)
    pub min_stop: Option<i64>,
    /// Duty below `MINTEMP` (`MINPWM`, fancontrol default 0)
    pub min_pwm: Option<i64>,
    /// Duty at and above `MAXTEMP` (`MAXPWM`, fancontrol default 255)
    pub max_pwm: Option<i64>,
    /// Number of temperature readings averaged (`AVERAGE`, default 1)
    pub average: Option<i64>,
}

impl FanControl {
    /// A control with the values pwmconfig proposes for a new output
    pub fn with_temp(temp: SensorRef) -> Self {
        Self {
            temp: Some(temp),
            min_temp: Some(20),
            max_temp: Some(60),
            min_start: Some(150),
            min_stop: Some(0),
            ..Self::default()
        }
    }

    pub fn effective_min_pwm(&self) -> i64 {
        self.min_pwm.unwrap_or(pwm::DEFAULT_MIN_PWM)
    }

    pub fn effective_max_pwm(&self) -> i64 {
        self.max_pwm.unwrap_or(pwm::DEFAULT_MAX_PWM)
    }

    /// Ordered (temperature °C, duty) control points of the curve.
    ///
    /// fancontrol interpolates linearly between `(MINTEMP, MINSTOP)` and
    /// `(MAXTEMP, MAXPWM)`; both endpoints are needed for a curve.
    pub fn points(&self) -> Vec<(i64, i64)> {
        match (self.min_temp, self.max_temp) {
            (Some(min_t), Some(max_t)) => vec![
                (min_t, self.min_stop.unwrap_or(pwm::MIN_VALUE)),
                (max_t, self.effective_max_pwm()),
            ],
            _ => Vec::new(),
        }
    }

    /// Duty fancontrol would write for `temp_c`, ignoring the MINSTART kick.
    pub fn pwm_for(&self, temp_c: i64) -> Option<i64> {
        let min_t = self.min_temp?;
        let max_t = self.max_temp?;
        let min_stop = self.min_stop.unwrap_or(pwm::MIN_VALUE);
        let max_pwm = self.effective_max_pwm();

        let duty = if temp_c <= min_t {
            self.effective_min_pwm()
        } else if temp_c >= max_t {
            max_pwm
        } else {
            (temp_c - min_t) * (max_pwm - min_stop) / (max_t - min_t) + min_stop
        };
        Some(duty.clamp(pwm::MIN_VALUE, pwm::MAX_VALUE))
    }

    /// Consistency checks pwmconfig applies before writing a file
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.temp.is_none() {
            issues.push("no temperature source".to_string());
        }
        if let (Some(min_t), Some(max_t)) = (self.min_temp, self.max_temp) {
            if min_t >= max_t {
                issues.push(format!("MINTEMP {} is not below MAXTEMP {}", min_t, max_t));
            }
        }
        let duties = [
            ("MINSTART", self.min_start),
            ("MINSTOP", self.min_stop),
            ("MINPWM", self.min_pwm),
            ("MAXPWM", self.max_pwm),
        ];
        for (name, value) in duties {
            if let Some(v) = value {
                if !(pwm::MIN_VALUE..=pwm::MAX_VALUE).contains(&v) {
                    issues.push(format!("{} {} is outside 0-255", name, v));
                }
            }
        }
        if let Some(min_stop) = self.min_stop {
            if min_stop > self.effective_max_pwm() {
                issues.push(format!("MINSTOP {} exceeds MAXPWM {}", min_stop, self.effective_max_pwm()));
            }
        }
        if let Some(avg) = self.average {
            if avg < 1 {
                issues.push(format!("AVERAGE {} must be at least 1", avg));
            }
        }
        issues
    }

    /// Every sensor this control refers to besides its own output
    pub fn sources(&self) -> impl Iterator<Item = SensorRef> + '_ {
        self.temp.into_iter().chain(self.fans.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FanControl {
        FanControl {
            temp: Some(SensorRef::temp(1, 0)),
            fans: vec![SensorRef::fan(0, 0)],
            min_temp: Some(30),
            max_temp: Some(70),
            min_start: Some(150),
            min_stop: Some(55),
            min_pwm: Some(0),
            max_pwm: Some(255),
            average: None,
        }
    }

    #[test]
    fn test_points_are_ordered_pairs() {
        assert_eq!(sample().points(), vec![(30, 55), (70, 255)]);
        assert!(FanControl::default().points().is_empty());
    }

    #[test]
    fn test_pwm_for_follows_fancontrol_formula() {
        let c = sample();
        assert_eq!(c.pwm_for(20), Some(0));
        assert_eq!(c.pwm_for(30), Some(0));
        assert_eq!(c.pwm_for(50), Some((50 - 30) * (255 - 55) / (70 - 30) + 55));
        assert_eq!(c.pwm_for(70), Some(255));
        assert_eq!(c.pwm_for(95), Some(255));
        assert_eq!(FanControl::default().pwm_for(50), None);
    }

    #[test]
    fn test_validate_reports_inverted_range() {
        let mut c = sample();
        assert!(c.validate().is_empty());
        c.min_temp = Some(80);
        c.min_stop = Some(300);
        let issues = c.validate();
        assert!(issues.iter().any(|i| i.contains("MINTEMP")));
        assert!(issues.iter().any(|i| i.contains("MINSTOP 300 is outside")));
    }

    #[test]
    fn test_with_temp_defaults() {
        let c = FanControl::with_temp(SensorRef::temp(0, 1));
        assert_eq!(c.min_temp, Some(20));
        assert_eq!(c.max_temp, Some(60));
        assert!(c.validate().is_empty());
        assert_eq!(c.sources().count(), 1);
    }
}
