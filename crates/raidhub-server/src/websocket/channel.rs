//! Fan-out of notifications to connected clients.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use raidhub_core::{ConnectionId, Notification, Notifier, SessionId};
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::NOTIFICATIONS_DROPPED_TOTAL;

/// One connection slot per session. A reconnect replaces the old slot.
pub struct NotificationChannel {
    connections: RwLock<HashMap<SessionId, Arc<ClientConnection>>>,
}

impl NotificationChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. Returns the connection it displaced, if any;
    /// the caller is expected to close it.
    pub fn add(&self, connection: Arc<ClientConnection>) -> Option<Arc<ClientConnection>> {
        let session_id = connection.session_id.clone();
        let replaced = self.connections.write().insert(session_id.clone(), connection);
        if let Some(old) = &replaced {
            debug!(%session_id, old_conn = %old.id, "notification connection replaced");
        }
        replaced
    }

    /// Unregister `connection_id` for `session_id`.
    ///
    /// A no-op when the slot has since been taken by a newer connection.
    pub fn remove(&self, session_id: &SessionId, connection_id: &ConnectionId) -> bool {
        let mut conns = self.connections.write();
        match conns.get(session_id) {
            Some(current) if current.id == *connection_id => {
                let _ = conns.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// The open connection of `session_id`.
    pub fn get(&self, session_id: &SessionId) -> Option<Arc<ClientConnection>> {
        self.connections.read().get(session_id).cloned()
    }

    /// Close every connection.
    pub fn close_all(&self) {
        for conn in self.connections.read().values() {
            conn.close();
        }
    }

    fn serialize(notification: &Notification) -> Option<Arc<String>> {
        match serde_json::to_string(notification) {
            Ok(json) => Some(Arc::new(json)),
            Err(error) => {
                warn!(event_type = notification.event_type(), %error, "failed to serialize notification");
                None
            }
        }
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationChannel {
    fn broadcast(&self, notification: &Notification) -> usize {
        let Some(json) = Self::serialize(notification) else {
            return 0;
        };
        let event_type = notification.event_type();
        let conns = self.connections.read();
        let mut delivered = 0;
        for conn in conns.values() {
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                counter!(NOTIFICATIONS_DROPPED_TOTAL, "type" => event_type).increment(1);
                warn!(conn_id = %conn.id, session_id = %conn.session_id, event_type, "failed to send notification");
            }
        }
        debug!(event_type, recipients = conns.len(), delivered, "broadcast notification");
        delivered
    }

    fn send_to(&self, session_id: &SessionId, notification: &Notification) -> bool {
        let Some(conn) = self.get(session_id) else {
            debug!(%session_id, event_type = notification.event_type(), "recipient not connected");
            return false;
        };
        let Some(json) = Self::serialize(notification) else {
            return false;
        };
        let sent = conn.send(json);
        if !sent {
            counter!(NOTIFICATIONS_DROPPED_TOTAL, "type" => notification.event_type()).increment(1);
            warn!(conn_id = %conn.id, %session_id, event_type = notification.event_type(), "failed to send notification");
        }
        sent
    }

    fn is_connected(&self, session_id: &SessionId) -> bool {
        self.connections
            .read()
            .get(session_id)
            .is_some_and(|c| !c.is_closed())
    }
}
