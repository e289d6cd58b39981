//! # raidhub-runtime
//!
//! The stateful core of the coordinator:
//!
//! - [`MatchRegistry`]: live matches, keyed by server id
//! - [`HeadlessWorkerPool`]: headless workers and race-free assignment
//! - [`SessionOrchestrator`]: the operations exposed over HTTP
//! - [`collaborators`]: profile store and player registrar seams
//!
//! Each registry is constructed explicitly and shared by `Arc`; there is no
//! process-global state.

#![deny(unsafe_code)]

pub mod collaborators;
pub mod errors;
pub mod headless;
pub mod matches;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use collaborators::{
    MemoryPlayerRegistrar, MemoryProfileStore, PlayerRegistrar, ProfileStore, Progression,
};
pub use errors::{CollaboratorError, HeadlessStartError};
pub use headless::{HeadlessWorkerPool, PoolConfig};
pub use matches::{MatchLifecycle, MatchRegistry};
pub use orchestrator::SessionOrchestrator;
