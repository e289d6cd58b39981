//! # raidhub-server
//!
//! Network surface of the coordinator:
//!
//! - [`server::RaidServer`]: axum router, listener and background tasks
//! - [`api`]: `/fika` routes dispatched through a method registry
//! - [`websocket`]: the notification channel over per-session WebSockets
//! - [`sweeper`]: ends matches whose host stopped pinging
//! - [`health`], [`metrics`], [`shutdown`]: operational endpoints and lifecycle

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod sweeper;
pub mod websocket;

pub use config::ServerConfig;
pub use server::RaidServer;
pub use websocket::NotificationChannel;
