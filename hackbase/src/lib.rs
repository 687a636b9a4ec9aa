//! HackBase - hackathon collaboration backend.
//!
//! Registries (teams, projects, mentors), a singleton chat server, snapshot
//! persistence, and the supervisor tree that starts and restarts them.

pub mod actors;
pub mod app_state;
pub mod cli;
pub mod runtime_env;
pub mod snapshot;
pub mod supervisor;

pub use app_state::AppState;
pub use snapshot::SnapshotStore;
