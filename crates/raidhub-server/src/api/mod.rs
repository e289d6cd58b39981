//! The `/fika` HTTP API: caller identity, route registry and handlers.

pub mod context;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod registry;

pub use context::ApiContext;
pub use errors::ApiError;
pub use registry::{MethodHandler, MethodRegistry};
