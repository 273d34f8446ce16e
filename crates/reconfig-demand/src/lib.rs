//! reconfig-demand — per-name demand accounting.
//!
//! Active replicas record every client request here. The store keeps one
//! [`DemandProfile`] per service name and answers two questions
//! atomically: should this replica report its demand upstream now, and
//! does the accumulated demand justify moving the service's replicas.
//!
//! # Components
//!
//! - **`profile`** — the pluggable strategy trait and its exported stats
//! - **`registry`** — name pattern → strategy factory resolution
//! - **`request_rate`** — the built-in request-count strategy
//! - **`store`** — the bounded, mutex-guarded profile table
//! - **`reporter`** — background loop that trims the table and ships
//!   evicted profiles
//!
//! The table has no persistent backing. `trim` bounds its memory by
//! evicting profiles so the caller can ship them to reconfigurators; a
//! restart loses whatever was not shipped.

pub mod error;
pub mod profile;
pub mod registry;
pub mod reporter;
pub mod request_rate;
pub mod store;

pub use error::{DemandError, DemandResult};
pub use profile::{DemandProfile, DemandStats, NullProfile, NullProfileFactory, ProfileFactory};
pub use registry::ProfileRegistry;
pub use reporter::{DemandReporter, ShipCallback};
pub use request_rate::{RateParams, RequestRateFactory, RequestRateProfile};
pub use store::DemandProfileStore;
