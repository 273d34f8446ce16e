//! reconfig-core — shared vocabulary for the reconfiguration control plane.
//!
//! Everything the demand, partition, packet, and application crates agree
//! on lives here: name and node identifiers, active-replica sets, the
//! reconfiguration policy carried by create requests, the cluster view
//! consumed by demand strategies, and the TOML configuration.

pub mod cluster;
pub mod config;
pub mod error;
pub mod types;

pub use cluster::{ClusterInfo, StaticClusterInfo};
pub use config::{DemandConfig, PartitionConfig, ProfileRule, ReconfigConfig, RequestRateConfig};
pub use error::{CoreError, CoreResult};
pub use types::*;
