//! # robinwood-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RobinwoodSettings::default()`]
//! 2. **User file**: `~/.robinwood/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `ROBINWOOD_*` overrides (highest priority)
//!
//! The loaded value is handed to the service at startup and passed down by
//! reference; there is no process-wide singleton.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, robinwood_home, settings_path};
pub use types::*;
