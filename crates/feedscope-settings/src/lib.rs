//! # feedscope-settings
//!
//! Layered configuration for the feedscope pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`FeedscopeSettings::default()`]
//! 2. **User file**: `~/.feedscope/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `FEEDSCOPE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = FeedscopeSettings::default();
        let path = settings_path();
        assert!(path.ends_with(".feedscope/settings.json"));
    }
}
