use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Gateway endpoints and request behavior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Base URL of the gateway API, including the `/api/wa` prefix.
    pub base_url: String,
    /// Event stream URL. Defaults to `<baseUrl>/events` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_url: Option<String>,
    /// Timeout for request/response calls (not the event stream).
    pub request_timeout_ms: u64,
    /// Session id used before the gateway reports one.
    pub session_name: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/wa".to_string(),
            events_url: None,
            request_timeout_ms: 15_000,
            session_name: "default".to_string(),
        }
    }
}

impl GatewaySettings {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Resolved event stream URL.
    pub fn events_url(&self) -> String {
        self.events_url
            .clone()
            .unwrap_or_else(|| format!("{}/events", self.base_url.trim_end_matches('/')))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("gateway.baseUrl", Some(self.base_url.as_str())),
            ("gateway.eventsUrl", self.events_url.as_deref()),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(SettingsError::InvalidValue(format!(
                        "{key} must be an http(s) URL, got {url:?}"
                    )));
                }
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "gateway.requestTimeoutMs must be > 0".to_string(),
            ));
        }
        if self.session_name.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "gateway.sessionName must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_derived_from_base() {
        let settings = GatewaySettings {
            base_url: "http://gw:3000/api/wa/".into(),
            ..GatewaySettings::default()
        };
        assert_eq!(settings.events_url(), "http://gw:3000/api/wa/events");
    }

    #[test]
    fn events_url_override_wins() {
        let settings = GatewaySettings {
            events_url: Some("http://push:9000/stream".into()),
            ..GatewaySettings::default()
        };
        assert_eq!(settings.events_url(), "http://push:9000/stream");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let settings = GatewaySettings {
            base_url: "ftp://gw".into(),
            ..GatewaySettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let settings = GatewaySettings {
            request_timeout_ms: 0,
            ..GatewaySettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
