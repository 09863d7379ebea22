//! # reloop-settings
//!
//! Configuration management with layered sources for the reloop service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ReloopSettings::default()`]
//! 2. **JSON file** — `~/.reloop/settings.json` (deep-merged over
//!    defaults; path overridable via `RELOOP_SETTINGS_PATH`)
//! 3. **Environment variables** — `RELOOP_*` overrides (highest priority)
//!
//! There is no global settings singleton: the server binary loads
//! settings once at startup and passes them to the components that need
//! them, matching the dependency-injected construction of the rest of
//! the service.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
