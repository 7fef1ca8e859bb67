//! The gateway contract the engine programs against.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use wa_core::QrPayload;

use crate::errors::Result;
use crate::status::StatusReport;

/// One server-sent event, before domain decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    /// Event name (`session.status`, `session.qr`, `message`, ...).
    pub event: String,
    /// Raw `data:` payload, normally JSON.
    pub data: String,
}

impl RawEvent {
    /// Build a raw event.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Push channel as a stream of raw events. Ends when the server closes it.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RawEvent>> + Send>>;

/// Operations the session engine needs from the gateway.
///
/// Acks are opaque: a successful response body is not inspected.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// `POST /session/start`
    async fn start_session(&self) -> Result<()>;

    /// `POST /session/stop`
    async fn stop_session(&self) -> Result<()>;

    /// `POST /session/logout`
    async fn logout(&self) -> Result<()>;

    /// `GET /session/status`
    async fn get_status(&self) -> Result<StatusReport>;

    /// `GET /session/{session}/qr`
    async fn get_qr(&self, session: &str) -> Result<QrPayload>;

    /// `POST /message/send` with an already-normalized phone number.
    async fn send_message(&self, phone: &str, message: &str) -> Result<()>;

    /// `GET /test`
    async fn health(&self) -> Result<String>;

    /// `GET /events`, held open.
    async fn subscribe_events(&self) -> Result<EventStream>;
}
