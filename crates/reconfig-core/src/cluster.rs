//! Cluster view consumed by demand strategies and reconfigurators.
//!
//! The real membership service lives outside this workspace; strategies
//! only need to know which active replicas and reconfigurators exist and
//! where the replicas are reachable.

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;

use crate::types::{ActiveSet, NodeId};

/// Read-only view of cluster membership.
pub trait ClusterInfo: Send + Sync {
    /// All active replicas currently able to host services.
    fn active_replicas(&self) -> ActiveSet;

    /// All reconfigurators currently partitioning the name space.
    fn reconfigurators(&self) -> BTreeSet<NodeId>;

    /// Client-facing address of an active replica, if known.
    fn replica_address(&self, node: &str) -> Option<SocketAddr>;
}

/// Fixed, in-memory cluster view.
#[derive(Debug, Clone, Default)]
pub struct StaticClusterInfo {
    replicas: BTreeMap<NodeId, Option<SocketAddr>>,
    reconfigurators: BTreeSet<NodeId>,
}

impl StaticClusterInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active replica without a known address.
    pub fn with_replica(mut self, node: impl Into<NodeId>) -> Self {
        self.replicas.insert(node.into(), None);
        self
    }

    /// Add an active replica reachable at `addr`.
    pub fn with_replica_at(mut self, node: impl Into<NodeId>, addr: SocketAddr) -> Self {
        self.replicas.insert(node.into(), Some(addr));
        self
    }

    pub fn with_reconfigurator(mut self, node: impl Into<NodeId>) -> Self {
        self.reconfigurators.insert(node.into());
        self
    }
}

impl ClusterInfo for StaticClusterInfo {
    fn active_replicas(&self) -> ActiveSet {
        self.replicas.keys().cloned().collect()
    }

    fn reconfigurators(&self) -> BTreeSet<NodeId> {
        self.reconfigurators.clone()
    }

    fn replica_address(&self, node: &str) -> Option<SocketAddr> {
        self.replicas.get(node).copied().flatten()
    }
}
