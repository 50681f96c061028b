//! Hardware interaction modules
//!
//! Read-only access to the hwmon tree.

mod discovery;

pub use discovery::{discover, Discovery};
