//! # wa-gateway
//!
//! Typed client for the messaging gateway.
//!
//! - [`GatewayClient`]: the contract the engine programs against
//! - [`HttpGatewayClient`]: `reqwest` implementation of that contract
//! - [`events`]: tagged decode of `session.status` / `session.qr` / `message`
//! - [`sse`]: server-sent-event framing for the push channel
//! - [`status`]: tolerant parsing of status responses (object or array)

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod events;
pub mod http;
pub mod sse;
pub mod status;

pub use client::{EventStream, GatewayClient, RawEvent};
pub use errors::{GatewayError, Result};
pub use events::{GatewayEvent, decode_event};
pub use http::HttpGatewayClient;
pub use status::{StatusReport, parse_status_response};
