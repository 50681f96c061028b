//! fancontrol file rendering and atomic persistence

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::model::ConfigModel;
use crate::constants::fancontrol;
use crate::error::{FancontrolError, Result};

/// Render the model as file text.
///
/// Lines whose directive did not change since parsing are emitted exactly as
/// read. Changed directives are rewritten in place (a directive that became
/// empty is dropped), and directives the file never had are appended in
/// canonical order.
pub fn render(model: &ConfigModel) -> String {
    let mut out: Vec<String> = Vec::new();
    if model.is_fresh() {
        out.push(fancontrol::HEADER.to_string());
    }

    let mut last_owner: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (i, line) in model.lines().iter().enumerate() {
        if let Some(key) = line.key {
            last_owner.insert(key, i);
        }
    }

    for (i, line) in model.lines().iter().enumerate() {
        match line.key {
            Some(key) if model.is_changed(key) => {
                // Earlier duplicates collapse into the last definition
                if last_owner.get(key) == Some(&i) {
                    if let Some(value) = model.render_value(key) {
                        out.push(format!("{}={}", key, value));
                    }
                }
            }
            _ => out.push(line.raw.clone()),
        }
    }

    for key in fancontrol::KEY_ORDER {
        if last_owner.contains_key(key) {
            continue;
        }
        if let Some(value) = model.render_value(key) {
            out.push(format!("{}={}", key, value));
        }
    }

    let mut text = out.join("\n");
    if model.trailing_newline || model.is_fresh() {
        text.push('\n');
    }
    text
}

/// Sibling temporary file used while writing `path`
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fancontrol".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write `contents` to `path` atomically (temp file, sync, rename)
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    write_atomic_with(path, contents, |from, to| fs::rename(from, to))
}

pub(crate) fn write_atomic_with<F>(path: &Path, contents: &str, rename: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let temp_path = temp_path(path);

    let staged = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    })();

    if let Err(e) = staged {
        discard(&temp_path);
        return Err(FancontrolError::FileWrite {
            path: temp_path,
            source: e,
        });
    }

    if let Err(e) = rename(&temp_path, path) {
        discard(&temp_path);
        return Err(FancontrolError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        });
    }

    debug!(path = ?path, bytes = contents.len(), "Wrote file atomically");
    Ok(())
}

fn discard(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = ?temp_path, error = %e, "Could not remove temporary file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse;
    use crate::data::{FanControl, SensorRef};
    use crate::test_utils::STANDARD_CONFIG;
    use tempfile::TempDir;

    #[test]
    fn test_unchanged_round_trip_is_byte_identical() {
        let odd = "# hand written\n\nINTERVAL = 7\nMINTEMP=hwmon0/pwm1=30   hwmon0/pwm2=bogus\nFOO=bar\nFCTEMPS=hwmon0/pwm1=hwmon0/temp1_input";
        for text in [STANDARD_CONFIG, odd, "", "\n\n"] {
            assert_eq!(render(&parse(text)), text);
        }
    }

    #[test]
    fn test_changed_directive_rewritten_in_place() {
        let mut m = parse(STANDARD_CONFIG);
        m.set_interval(5).unwrap();
        let text = render(&m);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "INTERVAL=5");
        assert_eq!(lines.len(), 10);
        assert_eq!(text.replace("INTERVAL=5", "INTERVAL=10"), STANDARD_CONFIG);
    }

    #[test]
    fn test_new_directive_appended_and_empty_dropped() {
        let mut m = parse(STANDARD_CONFIG);
        let pwm1 = SensorRef::pwm(0, 0);
        let mut c = m.control(pwm1).cloned().unwrap();
        c.max_pwm = Some(200);
        c.fans.clear();
        m.set_control(pwm1, c);

        let pwm2 = SensorRef::pwm(0, 1);
        let mut c = m.control(pwm2).cloned().unwrap();
        c.fans.clear();
        m.set_control(pwm2, c);

        let text = render(&m);
        assert!(!text.contains("FCFANS"));
        assert!(text.ends_with("MAXPWM=hwmon0/pwm1=200\n"));
    }

    #[test]
    fn test_uninterpreted_pairs_survive_an_edit() {
        let mut m = parse("MINTEMP=hwmon0/pwm1=30 hwmon0/pwm2=35 hwmon0/pwm3=abc\n");
        let pwm1 = SensorRef::pwm(0, 0);
        let mut c = m.control(pwm1).cloned().unwrap();
        c.min_temp = Some(45);
        m.set_control(pwm1, c);

        assert_eq!(render(&m), "MINTEMP=hwmon0/pwm1=45 hwmon0/pwm2=35 hwmon0/pwm3=abc\n");
    }

    #[test]
    fn test_duplicates_collapse_when_changed() {
        let mut m = parse("INTERVAL=10\n# between\nINTERVAL=4\n");
        assert_eq!(render(&m), "INTERVAL=10\n# between\nINTERVAL=4\n");
        m.set_interval(6).unwrap();
        assert_eq!(render(&m), "# between\nINTERVAL=6\n");
    }

    #[test]
    fn test_fresh_model_has_header() {
        let mut m = ConfigModel::new();
        m.set_control(SensorRef::pwm(0, 0), FanControl::with_temp(SensorRef::temp(0, 0)));
        let text = render(&m);
        assert!(text.starts_with(fancontrol::HEADER));
        assert!(text.contains("\nINTERVAL=10\nFCTEMPS=hwmon0/pwm1=hwmon0/temp1_input\nMINTEMP=hwmon0/pwm1=20\n"));
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fancontrol");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_failed_rename_leaves_original_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fancontrol");
        fs::write(&path, STANDARD_CONFIG).unwrap();

        let err = write_atomic_with(&path, "INTERVAL=1\n", |_, _| {
            Err(io::Error::new(io::ErrorKind::Other, "disk pulled"))
        })
        .unwrap_err();

        assert!(matches!(err, FancontrolError::FileWrite { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), STANDARD_CONFIG);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_unwritable_directory_fails_cleanly() {
        let err = write_atomic(Path::new("/nonexistent/dir/fancontrol"), "x").unwrap_err();
        assert!(matches!(err, FancontrolError::FileWrite { .. }));
    }
}
