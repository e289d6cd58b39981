//! Headless worker states and status-report normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::ids::SessionId;

/// Effective state of a headless worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeadlessStatus {
    /// Synthetic: the worker has not pinged within the liveness window.
    Offline,
    /// Idle and able to take a raid.
    Ready,
    /// Matched to a requester, raid not yet started.
    Assigned,
    /// Running a raid.
    InRaid,
}

/// Status a worker may report about itself.
///
/// `Offline` and `Assigned` are server-side states and never accepted from
/// the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedStatus {
    /// Idle and able to take a raid.
    Ready,
    /// Running a raid.
    InRaid,
}

impl From<ReportedStatus> for HeadlessStatus {
    fn from(s: ReportedStatus) -> Self {
        match s {
            ReportedStatus::Ready => Self::Ready,
            ReportedStatus::InRaid => Self::InRaid,
        }
    }
}

/// A status value exactly as the worker sent it.
///
/// The reporting client serializes its status enum inconsistently: sometimes
/// as the numeric code, sometimes as the textual token. Both forms are valid
/// input and are folded into [`ReportedStatus`] by [`WireStatus::normalize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireStatus {
    /// Numeric code: `1` ready, `2` in raid.
    Code(i64),
    /// Textual token: `"READY"` or `"IN_RAID"`.
    Token(String),
}

impl WireStatus {
    /// Map the wire value onto the internal enum.
    pub fn normalize(&self) -> Result<ReportedStatus> {
        match self {
            Self::Code(1) => Ok(ReportedStatus::Ready),
            Self::Code(2) => Ok(ReportedStatus::InRaid),
            Self::Code(other) => Err(CoreError::InvalidHeadlessStatus(other.to_string())),
            Self::Token(token) => match token.as_str() {
                "READY" | "1" => Ok(ReportedStatus::Ready),
                "IN_RAID" | "2" => Ok(ReportedStatus::InRaid),
                other => Err(CoreError::InvalidHeadlessStatus(other.to_owned())),
            },
        }
    }
}

/// Point-in-time view of one registered worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessWorkerInfo {
    /// Worker identity.
    pub session_id: SessionId,
    /// Effective state (liveness applied).
    pub state: HeadlessStatus,
    /// Wall-clock time of the last status report.
    pub last_ping: DateTime<Utc>,
    /// Requester the worker is serving, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_requester: Option<SessionId>,
}
