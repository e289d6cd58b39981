//! Notifications pushed to connected clients, and the delivery seam.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ids::{ServerId, SessionId};
use crate::raid::EndReason;

/// A typed event delivered over a client's notification connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// A host created a raid. Sent to everyone.
    StartedRaid {
        /// Host display name.
        nickname: String,
        /// Map identifier.
        location: String,
    },

    /// A match the recipient belonged to is gone.
    #[serde(rename_all = "camelCase")]
    MatchEnded {
        /// Match that ended.
        server_id: ServerId,
        /// Why it ended.
        reason: EndReason,
    },

    /// At least one headless worker became ready.
    HeadlessAvailable,

    /// Instructs a headless worker to start a raid for a requester.
    #[serde(rename = "fikaHeadlessStartRaid", rename_all = "camelCase")]
    HeadlessStartRaid {
        /// Player the raid is started for.
        requester_session_id: SessionId,
        /// Raid parameters forwarded verbatim from the requester.
        #[serde(flatten)]
        parameters: Map<String, Value>,
    },
}

impl Notification {
    /// Wire `type` tag, for logging and metrics labels.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartedRaid { .. } => "StartedRaid",
            Self::MatchEnded { .. } => "MatchEnded",
            Self::HeadlessAvailable => "HeadlessAvailable",
            Self::HeadlessStartRaid { .. } => "fikaHeadlessStartRaid",
        }
    }
}

/// Delivery of notifications to connected clients.
///
/// Implementations must never block: a slow or dead connection drops the
/// message rather than stalling the caller.
pub trait Notifier: Send + Sync {
    /// Deliver to every connected client. Returns how many accepted it.
    fn broadcast(&self, notification: &Notification) -> usize;

    /// Deliver to one session. Returns `false` if it is not connected or its
    /// queue is full.
    fn send_to(&self, session_id: &SessionId, notification: &Notification) -> bool;

    /// Whether the session currently has an open connection.
    fn is_connected(&self, session_id: &SessionId) -> bool;
}
