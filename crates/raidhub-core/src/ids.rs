//! Branded ID newtypes for type safety.
//!
//! Session and server identifiers arrive from clients as opaque strings and
//! are never generated here. Wrapping them keeps a server id from being
//! passed where a session id is expected, even though a host's session id
//! and the server id of the match it hosts share the same value.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of a live match, chosen by its host at creation.
    ServerId
}

branded_id! {
    /// Authenticated client session. Doubles as the player's profile id.
    SessionId
}

branded_id! {
    /// Identifier of a single notification connection.
    ConnectionId
}

impl ServerId {
    /// Whether `session` is the host of this match.
    ///
    /// A match is hosted by the session whose id equals the server id.
    #[must_use]
    pub fn is_hosted_by(&self, session: &SessionId) -> bool {
        self.0 == session.0
    }

    /// The session id of this match's host.
    #[must_use]
    pub fn host_session(&self) -> SessionId {
        SessionId(self.0.clone())
    }
}

impl ConnectionId {
    /// Create a new random connection ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}
