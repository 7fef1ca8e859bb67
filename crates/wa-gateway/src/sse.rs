//! Server-sent events framing for the `/events` push channel.
//!
//! Line buffering and field parsing are delegated to `eventsource-stream`;
//! this module only maps frames onto [`RawEvent`] and errors onto
//! [`GatewayError::Stream`].

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use tracing::trace;

use crate::client::{EventStream, RawEvent};
use crate::errors::GatewayError;

/// Turn a response body into a stream of raw events.
///
/// Frames with an empty `data` field carry nothing to decode and are skipped.
pub fn raw_events<S>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let events = bytes.eventsource().filter_map(|frame| async move {
        match frame {
            Ok(event) if event.data.trim().is_empty() => None,
            Ok(event) => {
                trace!(event = %event.event, len = event.data.len(), "sse frame");
                Some(Ok(RawEvent::new(event.event, event.data)))
            }
            Err(e) => Some(Err(GatewayError::Stream(e.to_string()))),
        }
    });
    Box::pin(events)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
