//! # taskflow-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TaskflowSettings::default()`]
//! 2. **User file**: `~/.taskflow/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TASKFLOW_*` overrides (highest priority)
//!
//! The binary applies CLI flags on top of the loaded value.
//!
//! ## Crate Position
//!
//! Leaf crate. Depended on by `taskflow-tasks` (engine policies),
//! `taskflow-server` and the `taskflow` binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, settings_path, taskflow_home,
};
pub use types::*;
