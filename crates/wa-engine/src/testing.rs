//! In-memory [`GatewayClient`] for tests.
//!
//! Records every call, answers from scripted state, and lets tests inject
//! raw events into the push channel or close it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use wa_core::{QrPayload, SessionStatus};
use wa_gateway::{EventStream, GatewayClient, GatewayError, RawEvent, Result, StatusReport};

/// Gateway operations, for scripting failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// `start_session`
    Start,
    /// `stop_session`
    Stop,
    /// `logout`
    Logout,
    /// `get_status`
    Status,
    /// `get_qr`
    Qr,
    /// `send_message`
    Send,
    /// `health`
    Health,
    /// `subscribe_events`
    Subscribe,
}

/// A recorded gateway call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// `POST /session/start`
    Start,
    /// `POST /session/stop`
    Stop,
    /// `POST /session/logout`
    Logout,
    /// `GET /session/status`
    Status,
    /// `GET /session/{session}/qr`
    Qr(String),
    /// `POST /message/send`
    Send {
        /// Normalized phone number.
        phone: String,
        /// Message text.
        message: String,
    },
    /// `GET /test`
    Health,
    /// `GET /events`
    Subscribe,
}

type EventSender = mpsc::UnboundedSender<Result<RawEvent>>;
type EventReceiver = mpsc::UnboundedReceiver<Result<RawEvent>>;

/// Scripted gateway.
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    status: Mutex<StatusReport>,
    qr: Mutex<QrPayload>,
    health: Mutex<String>,
    failures: Mutex<HashMap<Op, String>>,
    latency: Mutex<Duration>,
    events_tx: Mutex<Option<EventSender>>,
    events_rx: Mutex<Option<EventReceiver>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    /// Gateway reporting `SessionOff` for session `default`, with a small
    /// base64 QR and a healthy probe.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            calls: Mutex::new(Vec::new()),
            status: Mutex::new(StatusReport::new(SessionStatus::SessionOff).with_session("default")),
            qr: Mutex::new(QrPayload::text("iVBORw0KGgo=")),
            health: Mutex::new("pong".to_string()),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
            events_tx: Mutex::new(Some(events_tx)),
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Status returned by subsequent `get_status` calls.
    pub fn set_status(&self, status: SessionStatus) {
        let mut report = self.status.lock();
        report.status = status;
    }

    /// Full status report returned by subsequent `get_status` calls.
    pub fn set_status_report(&self, report: StatusReport) {
        *self.status.lock() = report;
    }

    /// Payload returned by subsequent `get_qr` calls.
    pub fn set_qr(&self, payload: QrPayload) {
        *self.qr.lock() = payload;
    }

    /// Text returned by `health`.
    pub fn set_health(&self, text: impl Into<String>) {
        *self.health.lock() = text.into();
    }

    /// Make `op` fail with an HTTP 500 carrying `message` until cleared.
    pub fn fail(&self, op: Op, message: impl Into<String>) {
        let _ = self.failures.lock().insert(op, message.into());
    }

    /// Let `op` succeed again.
    pub fn clear_failure(&self, op: Op) {
        let _ = self.failures.lock().remove(&op);
    }

    /// Delay applied to every request/response call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Push one raw event.
    pub fn push_event(&self, event: &str, data: &str) {
        self.push(Ok(RawEvent::new(event, data)));
    }

    /// Fail the push channel mid-stream.
    pub fn push_stream_error(&self, message: &str) {
        self.push(Err(GatewayError::Stream(message.to_string())));
    }

    /// End the push channel, as if the server closed it.
    pub fn close_events(&self) {
        drop(self.events_tx.lock().take());
    }

    fn push(&self, item: Result<RawEvent>) {
        if let Some(tx) = self.events_tx.lock().as_ref() {
            let _ = tx.send(item);
        }
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of `get_status` calls.
    pub fn status_calls(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == Call::Status).count()
    }

    /// Session ids of every `get_qr` call.
    pub fn qr_requests(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Qr(session) => Some(session.clone()),
                _ => None,
            })
            .collect()
    }

    /// Messages sent, as `(phone, message)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Send { phone, message } => Some((phone.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    async fn enter(&self, op: Op, call: Call) -> Result<()> {
        self.calls.lock().push(call);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.failures.lock().get(&op) {
            Some(message) => Err(GatewayError::Http {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn start_session(&self) -> Result<()> {
        self.enter(Op::Start, Call::Start).await
    }

    async fn stop_session(&self) -> Result<()> {
        self.enter(Op::Stop, Call::Stop).await
    }

    async fn logout(&self) -> Result<()> {
        self.enter(Op::Logout, Call::Logout).await
    }

    async fn get_status(&self) -> Result<StatusReport> {
        self.enter(Op::Status, Call::Status).await?;
        Ok(self.status.lock().clone())
    }

    async fn get_qr(&self, session: &str) -> Result<QrPayload> {
        self.enter(Op::Qr, Call::Qr(session.to_string())).await?;
        Ok(self.qr.lock().clone())
    }

    async fn send_message(&self, phone: &str, message: &str) -> Result<()> {
        self.enter(
            Op::Send,
            Call::Send {
                phone: phone.to_string(),
                message: message.to_string(),
            },
        )
        .await
    }

    async fn health(&self) -> Result<String> {
        self.enter(Op::Health, Call::Health).await?;
        Ok(self.health.lock().clone())
    }

    async fn subscribe_events(&self) -> Result<EventStream> {
        self.calls.lock().push(Call::Subscribe);
        if let Some(message) = self.failures.lock().get(&Op::Subscribe) {
            return Err(GatewayError::Stream(message.clone()));
        }
        let rx = self
            .events_rx
            .lock()
            .take()
            .ok_or_else(|| GatewayError::Stream("event stream already taken".into()))?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }
}
