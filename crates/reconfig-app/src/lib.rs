//! reconfig-app — the contract a replicated application implements.
//!
//! The reconfiguration layer drives applications through
//! [`ReplicatedApplication`]: it executes committed requests, takes
//! per-name checkpoints when a replica group moves, and restores (or
//! deletes) named state on the new group. [`NoopApp`] is the reference
//! implementation used by tests and local clusters.

pub mod app;
pub mod error;
pub mod noop;
pub mod request;

pub use app::ReplicatedApplication;
pub use error::{AppError, AppResult};
pub use noop::NoopApp;
pub use request::{AppRequest, AppRequestType, NO_OP};
