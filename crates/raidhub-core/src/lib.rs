//! # raidhub-core
//!
//! Foundation types shared by every raidhub crate:
//!
//! - **Branded IDs**: `ServerId`, `SessionId` as newtypes for type safety
//! - **Raid model**: `Match`, `RaidConfig` and the enums they carry
//! - **Headless workers**: `HeadlessStatus` and wire-status normalization
//! - **Notifications**: the `Notification` tagged union and the `Notifier` seam
//! - **Protocol**: request/response bodies for every HTTP operation
//! - **Errors**: `CoreError` via `thiserror`
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod headless;
pub mod ids;
pub mod logging;
pub mod notification;
pub mod protocol;
pub mod raid;

pub use errors::{CoreError, Result};
pub use ids::{ConnectionId, ServerId, SessionId};
pub use notification::{Notification, Notifier};
