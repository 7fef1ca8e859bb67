//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file only needs the keys it overrides.

mod gateway;
mod sync;

pub use gateway::*;
pub use sync::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for wa-console.
///
/// ```json
/// {
///   "gateway": { "baseUrl": "http://10.0.0.5:8080/api/wa" },
///   "sync": { "stopPollingOnFailure": true }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Settings schema version.
    pub version: String,
    /// Gateway endpoints and request behavior.
    pub gateway: GatewaySettings,
    /// Timer intervals for the synchronization engine.
    pub sync: SyncSettings,
    /// Phone number normalization.
    pub phone: PhoneSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            gateway: GatewaySettings::default(),
            sync: SyncSettings::default(),
            phone: PhoneSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ConsoleSettings {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;
        self.sync.validate()?;
        self.phone.validate()?;
        Ok(())
    }
}

/// Phone number normalization settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhoneSettings {
    /// Country calling code prepended to local numbers.
    pub country_code: String,
    /// Single trunk digit replaced by the country code.
    pub trunk_prefix: String,
}

impl Default for PhoneSettings {
    fn default() -> Self {
        Self {
            country_code: "62".to_string(),
            trunk_prefix: "0".to_string(),
        }
    }
}

impl PhoneSettings {
    /// The trunk prefix as a single digit.
    ///
    /// Only meaningful after [`PhoneSettings::validate`] succeeded; falls
    /// back to `'0'` otherwise.
    pub fn trunk_digit(&self) -> char {
        self.trunk_prefix.chars().next().unwrap_or('0')
    }

    fn validate(&self) -> Result<()> {
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(SettingsError::InvalidValue(format!(
                "phone.countryCode must be digits, got {:?}",
                self.country_code
            )));
        }
        let mut chars = self.trunk_prefix.chars();
        let valid_trunk = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit());
        if !valid_trunk {
            return Err(SettingsError::InvalidValue(format!(
                "phone.trunkPrefix must be a single digit, got {:?}",
                self.trunk_prefix
            )));
        }
        // A country code starting with the trunk digit would be rewritten again on
        // every normalization pass.
        if self.country_code.starts_with(&self.trunk_prefix) {
            return Err(SettingsError::InvalidValue(
                "phone.countryCode must not start with phone.trunkPrefix".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: ConsoleSettings =
            serde_json::from_str(r#"{"gateway": {"sessionName": "ops"}}"#).unwrap();
        assert_eq!(settings.gateway.session_name, "ops");
        assert_eq!(settings.gateway.base_url, "http://localhost:8080/api/wa");
        assert_eq!(settings.sync, SyncSettings::default());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ConsoleSettings::default()).unwrap();
        assert!(json["sync"]["statusPollIntervalMs"].is_u64());
        assert!(json["phone"]["countryCode"].is_string());
    }

    #[test]
    fn country_code_must_be_digits() {
        let mut settings = ConsoleSettings::default();
        settings.phone.country_code = "+62".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn trunk_prefix_must_be_one_digit() {
        let mut settings = ConsoleSettings::default();
        settings.phone.trunk_prefix = "00".into();
        assert!(settings.validate().is_err());
        settings.phone.trunk_prefix = "x".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn country_code_cannot_start_with_trunk() {
        let mut settings = ConsoleSettings::default();
        settings.phone.country_code = "062".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn trunk_digit() {
        assert_eq!(PhoneSettings::default().trunk_digit(), '0');
    }
}
