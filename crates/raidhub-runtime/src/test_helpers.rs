//! Shared fakes for unit tests.

use std::collections::HashSet;

use parking_lot::Mutex;
use raidhub_core::{Notification, Notifier, SessionId};

/// Where a recorded notification went.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Broadcast(Notification),
    Direct(SessionId, Notification),
}

/// In-memory `Notifier` that records deliveries.
#[derive(Default)]
pub struct RecordingNotifier {
    connected: Mutex<HashSet<SessionId>>,
    refusing: Mutex<HashSet<SessionId>>,
    log: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, session: &str) {
        let _ = self.connected.lock().insert(SessionId::from(session));
    }

    pub fn disconnect(&self, session: &str) {
        let _ = self.connected.lock().remove(&SessionId::from(session));
    }

    /// Connected, but every `send_to` fails as if the queue were full.
    pub fn refuse(&self, session: &str) {
        self.connect(session);
        let _ = self.refusing.lock().insert(SessionId::from(session));
    }

    pub fn sent_to(&self, session: &str) -> Vec<Notification> {
        let target = SessionId::from(session);
        self.log
            .lock()
            .iter()
            .filter_map(|d| match d {
                Delivery::Direct(to, n) if *to == target => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<Notification> {
        self.log
            .lock()
            .iter()
            .filter_map(|d| match d {
                Delivery::Broadcast(n) => Some(n.clone()),
                Delivery::Direct(..) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn broadcast(&self, notification: &Notification) -> usize {
        self.log.lock().push(Delivery::Broadcast(notification.clone()));
        self.connected.lock().len()
    }

    fn send_to(&self, session_id: &SessionId, notification: &Notification) -> bool {
        if !self.connected.lock().contains(session_id) || self.refusing.lock().contains(session_id) {
            return false;
        }
        self.log
            .lock()
            .push(Delivery::Direct(session_id.clone(), notification.clone()));
        true
    }

    fn is_connected(&self, session_id: &SessionId) -> bool {
        self.connected.lock().contains(session_id)
    }
}
