//! # wa-engine
//!
//! Session-state synchronization for one console view.
//!
//! A single [`SessionStore`] holds the truth. Three sources write to it:
//!
//! - [`RealtimeEventBridge`]: decoded push events from the gateway stream
//! - [`PollingSupervisor`]: periodic status checks and QR refresh
//! - [`SessionController`]: user-triggered operations
//!
//! [`SessionView`] wires them together for one mount/teardown lifetime.
//!
//! The in-memory gateway in `testing` is only built for this crate's tests
//! or with the `test-helpers` feature.

#![deny(unsafe_code)]

pub mod bridge;
pub mod controller;
pub mod notice;
pub mod scheduler;
pub mod store;
pub mod supervisor;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod view;

pub use bridge::{BridgeState, RealtimeEventBridge};
pub use controller::{Confirmer, OperationOutcome, SessionController};
pub use notice::NoticeBoard;
pub use scheduler::{ScheduledTask, TaskSlot};
pub use store::{FieldChange, FieldSubscription, OperationGuard, SessionStore};
pub use supervisor::PollingSupervisor;
pub use view::SessionView;
