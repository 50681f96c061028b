//! Runtime engine
//!
//! The observable [`Loader`] model and the [`polling`] task that drives it.

mod loader;
pub mod polling;

pub use loader::{Loader, SharedLoader};
pub use polling::{spawn, LoopHandle, LoopState};
