//! # mea-settings
//!
//! Layered configuration for the MEA client.
//!
//! Settings are resolved from (lowest to highest priority):
//! 1. **Compiled defaults**: [`MeaSettings::default()`]
//! 2. **User file**: `~/.mea/settings.json`, deep-merged over defaults
//! 3. **Environment**: `MEA_*` overrides
//!
//! Command-line flags are applied by the binary on top of the result. The
//! loaded value is passed explicitly to whoever needs it; there is no
//! process-wide settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    load_with, mea_dir, settings_path,
};
pub use types::*;
