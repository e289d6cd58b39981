//! Notification WebSocket: per-client connections, fan-out and liveness.

pub mod channel;
pub mod connection;
pub mod heartbeat;
pub mod session;

pub use channel::NotificationChannel;
pub use connection::ClientConnection;
pub use session::{DisconnectReason, run_notification_session};
