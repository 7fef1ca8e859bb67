//! `reqwest` implementation of [`GatewayClient`].
//!
//! Every request/response call carries the configured timeout. The event
//! stream is long-lived and only bounded by the connect timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use wa_core::QrPayload;
use wa_core::text::truncate_str;
use wa_settings::GatewaySettings;

use crate::client::{EventStream, GatewayClient};
use crate::errors::{GatewayError, Result};
use crate::sse;
use crate::status::{StatusReport, parse_status_response};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("wa-console/", env!("CARGO_PKG_VERSION"));

/// Longest response-body excerpt used as an error message.
const MAX_ERROR_BODY: usize = 200;

/// Fields of a JSON QR response that may hold the image string.
const QR_FIELDS: &[&str] = &["qr", "data", "url", "value"];

/// HTTP client for the gateway REST API and push channel.
#[derive(Clone, Debug)]
pub struct HttpGatewayClient {
    client: Client,
    base: Url,
    events: Url,
    timeout: Duration,
}

impl HttpGatewayClient {
    /// Build a client from gateway settings.
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        let base = parse_url(&settings.base_url)?;
        let events = parse_url(&settings.events_url())?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base,
            events,
            timeout: settings.request_timeout(),
        })
    }

    /// Base URL all REST endpoints hang off.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| GatewayError::InvalidUrl(self.base.to_string()))?;
            let _ = path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).timeout(self.timeout)
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url).timeout(self.timeout)
    }

    async fn post_ack(&self, segments: &[&str], body: &Value) -> Result<()> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let _ = check(self.post(url).json(body).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    #[instrument(skip(self))]
    async fn start_session(&self) -> Result<()> {
        self.post_ack(&["session", "start"], &json!({})).await
    }

    #[instrument(skip(self))]
    async fn stop_session(&self) -> Result<()> {
        self.post_ack(&["session", "stop"], &json!({})).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<()> {
        self.post_ack(&["session", "logout"], &json!({})).await
    }

    async fn get_status(&self) -> Result<StatusReport> {
        let url = self.endpoint(&["session", "status"])?;
        let resp = check(self.get(url).send().await?).await?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("status body: {e}")))?;
        parse_status_response(&body)
    }

    #[instrument(skip(self))]
    async fn get_qr(&self, session: &str) -> Result<QrPayload> {
        let url = self.endpoint(&["session", session, "qr"])?;
        let resp = check(self.get(url).send().await?).await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        match content_type.as_deref() {
            Some(ct) if ct.starts_with("application/json") => {
                let body: Value = resp
                    .json()
                    .await
                    .map_err(|e| GatewayError::InvalidResponse(format!("QR body: {e}")))?;
                qr_from_json(&body)
            }
            Some(ct) if ct.starts_with("text/") => Ok(QrPayload::Text(resp.text().await?)),
            _ => {
                let bytes = resp.bytes().await?;
                Ok(QrPayload::blob(bytes, content_type.as_deref()))
            }
        }
    }

    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn send_message(&self, phone: &str, message: &str) -> Result<()> {
        self.post_ack(
            &["message", "send"],
            &json!({ "phone": phone, "message": message }),
        )
        .await
    }

    async fn health(&self) -> Result<String> {
        let url = self.endpoint(&["test"])?;
        let resp = check(self.get(url).send().await?).await?;
        Ok(resp.text().await?.trim().to_string())
    }

    async fn subscribe_events(&self) -> Result<EventStream> {
        debug!(url = %self.events, "opening event stream");
        let resp = self
            .client
            .get(self.events.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(sse::raw_events(resp.bytes_stream()))
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| GatewayError::InvalidUrl(format!("{raw}: {e}")))
}

/// Turn a non-success response into [`GatewayError::Http`].
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Http {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// Best failure detail: JSON `message`/`error`, then the raw body, then the
/// canonical reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let from_json = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .or_else(|| value.pointer("/error/message").and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(msg) = from_json {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return truncate_str(trimmed, MAX_ERROR_BODY).to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

fn qr_from_json(body: &Value) -> Result<QrPayload> {
    if let Some(s) = body.as_str() {
        return Ok(QrPayload::text(s));
    }
    QR_FIELDS
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(QrPayload::text)
        .ok_or_else(|| GatewayError::InvalidResponse("QR response has no image field".into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
