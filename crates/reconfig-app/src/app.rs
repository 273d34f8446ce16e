//! The replicated application contract.

use std::collections::BTreeSet;

use reconfig_core::{RequestTypeId, ServiceRequest};

use crate::error::AppResult;

/// A deterministic application replicated across a group of nodes.
///
/// Every replica applies the same requests in the same order, so
/// implementations must not consult clocks, randomness, or local I/O when
/// executing.
pub trait ReplicatedApplication {
    type Request: ServiceRequest;

    /// Apply a committed request. The reserved no-op request always
    /// succeeds without touching state.
    fn execute(&mut self, request: &Self::Request) -> bool;

    /// Current state of `name`, or `None` if this replica does not hold it.
    fn checkpoint(&self, name: &str) -> Option<String>;

    /// Install `state` for `name`. `None` deletes the name; `Some` creates
    /// it if unknown or overwrites it otherwise. Repeating a restore
    /// leaves the same state.
    fn restore(&mut self, name: &str, state: Option<&str>) -> bool;

    /// Request types this application accepts.
    fn request_types(&self) -> BTreeSet<RequestTypeId>;

    /// Decode a stringified request handed over by the replication layer.
    fn parse_request(&self, stringified: &str) -> AppResult<Self::Request>;
}
