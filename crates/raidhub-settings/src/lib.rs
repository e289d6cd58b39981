//! # raidhub-settings
//!
//! Layered configuration for the raidhub coordinator.
//!
//! Settings are resolved in priority order:
//! 1. **Compiled defaults**: [`RaidhubSettings::default()`]
//! 2. **User file**: `~/.raidhub/settings.json` or an explicit path, deep-merged
//! 3. **Environment**: `RAIDHUB_*` overrides
//!
//! The binary applies its CLI flags last.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, validate};
pub use types::{HeadlessSettings, LoggingSettings, MatchSettings, RaidhubSettings, ServerSettings};
