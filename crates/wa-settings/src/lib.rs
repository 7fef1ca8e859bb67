//! # wa-settings
//!
//! Configuration management with layered sources for wa-console.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ConsoleSettings::default()`]
//! 2. **User file**: `~/.wa-console/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WA_CONSOLE_*` overrides (highest priority)
//!
//! The merged result is validated before it is handed to the engine.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ConsoleSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = ConsoleSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.gateway.base_url, "http://localhost:8080/api/wa");
        assert_eq!(settings.gateway.session_name, "default");
        assert_eq!(settings.sync.status_poll_interval_ms, 3_000);
        assert_eq!(settings.sync.qr_refresh_interval_ms, 30_000);
        assert_eq!(settings.sync.start_grace_ms, 3_000);
        assert_eq!(settings.sync.notice_ttl_ms, 5_000);
        assert!(!settings.sync.stop_polling_on_failure);
        assert_eq!(settings.phone.country_code, "62");
        assert_eq!(settings.phone.trunk_prefix, "0");
    }
}
