//! fancontrol configuration file
//!
//! Parsing, reconciliation with discovered hardware, rendering and atomic
//! writes of the lm-sensors `fancontrol` format.

pub mod model;
pub mod parser;
pub mod reconcile;
pub mod writer;

use std::fs;
use std::path::Path;

use crate::error::{FancontrolError, Result};

pub use model::{ConfigLine, ConfigModel};
pub use parser::parse;
pub use reconcile::{absorb_edits, reconcile, Reconciliation};
pub use writer::{render, write_atomic};

/// Read and parse a configuration file
pub fn load(path: &Path) -> Result<ConfigModel> {
    let text = fs::read_to_string(path).map_err(|e| FancontrolError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse(&text))
}
