//! # wa-core
//!
//! Foundation types, errors, and normalizers for the wa-console session engine.
//!
//! This crate provides the shared vocabulary that the gateway client and the
//! synchronization engine both depend on:
//!
//! - **Session status**: [`SessionStatus`] with the gateway wire mapping
//! - **QR artifacts**: [`QrPayload`] → [`ImageRef`] normalization, [`QrArtifact`]
//! - **Phone numbers**: [`PhoneFormatter`] for canonical gateway addressing
//! - **Inbound messages**: [`InboundMessage`] derived from loosely-shaped payloads
//! - **UI state**: [`UiState`], [`UiPatch`], [`Field`], [`Notice`]
//! - **Errors**: [`EngineError`] hierarchy via `thiserror`
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod message;
pub mod notice;
pub mod phone;
pub mod qr;
pub mod state;
pub mod status;
pub mod text;

pub use errors::{EngineError, ErrorKind, Result};
pub use message::InboundMessage;
pub use notice::{Notice, NoticeKind};
pub use phone::PhoneFormatter;
pub use qr::{ImageRef, QrArtifact, QrError, QrPayload};
pub use state::{Field, UiPatch, UiState};
pub use status::SessionStatus;
