//! The demand profile strategy contract.
//!
//! A profile accumulates statistics for one service name and owns the
//! policy built on them: when to report upstream and when to propose a new
//! placement. Profiles travel between processes as [`DemandStats`], the
//! exported form that a [`ProfileFactory`] turns back into a live profile.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use reconfig_core::{ActiveSet, ClusterInfo, ServiceName, ServiceRequest};

use crate::error::{DemandError, DemandResult};

/// Exported statistics of one profile.
///
/// `profile` is the registry key of the strategy that produced `stats`;
/// the shape of `stats` belongs to that strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandStats {
    pub name: ServiceName,
    pub profile: String,
    pub stats: serde_json::Value,
}

/// Accumulated demand for one service name plus its decision policy.
pub trait DemandProfile: Send + fmt::Debug {
    /// Service name this profile tracks.
    fn name(&self) -> &str;

    /// Registry key of the strategy.
    fn kind(&self) -> &str;

    /// Register `request` from `sender` and decide whether the local
    /// reporting threshold has been reached.
    fn should_report(
        &mut self,
        request: &dyn ServiceRequest,
        sender: IpAddr,
        cluster: &dyn ClusterInfo,
    ) -> bool;

    /// Propose a new placement, or `None` if the current one should stay.
    ///
    /// Must not touch anything outside the profile.
    fn reconfigure(&mut self, current: &ActiveSet, cluster: &dyn ClusterInfo)
    -> Option<ActiveSet>;

    /// Start the cool-down after a proposed placement was acted upon.
    fn just_reconfigured(&mut self);

    /// Fold in statistics gathered elsewhere for the same name.
    fn combine(&mut self, other: &DemandStats) -> DemandResult<()>;

    /// Export everything needed to rebuild an equivalent profile.
    fn stats(&self) -> DemandStats;
}

/// Builds profiles of one strategy.
pub trait ProfileFactory: Send + Sync {
    /// Registry key of the strategy this factory builds.
    fn kind(&self) -> &str;

    /// A fresh, empty profile for `name`.
    fn create(&self, name: &str) -> Box<dyn DemandProfile>;

    /// Rebuild a profile from its exported statistics.
    fn restore(&self, stats: &DemandStats) -> DemandResult<Box<dyn DemandProfile>>;
}

pub(crate) fn check_same_profile(
    name: &str,
    kind: &str,
    other: &DemandStats,
) -> DemandResult<()> {
    if other.name != name {
        return Err(DemandError::NameMismatch {
            expected: name.to_string(),
            found: other.name.clone(),
        });
    }
    if other.profile != kind {
        return Err(DemandError::KindMismatch {
            expected: kind.to_string(),
            found: other.profile.clone(),
        });
    }
    Ok(())
}

// ── Null strategy ─────────────────────────────────────────────────

/// A profile that never reports and never moves replicas.
///
/// Useful for names whose placement is managed by hand.
#[derive(Debug, Clone)]
pub struct NullProfile {
    name: ServiceName,
}

impl NullProfile {
    pub const KIND: &'static str = "null";

    pub fn new(name: impl Into<ServiceName>) -> Self {
        Self { name: name.into() }
    }
}

impl DemandProfile for NullProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn should_report(
        &mut self,
        _request: &dyn ServiceRequest,
        _sender: IpAddr,
        _cluster: &dyn ClusterInfo,
    ) -> bool {
        false
    }

    fn reconfigure(
        &mut self,
        _current: &ActiveSet,
        _cluster: &dyn ClusterInfo,
    ) -> Option<ActiveSet> {
        None
    }

    fn just_reconfigured(&mut self) {}

    fn combine(&mut self, other: &DemandStats) -> DemandResult<()> {
        check_same_profile(&self.name, Self::KIND, other)
    }

    fn stats(&self) -> DemandStats {
        DemandStats {
            name: self.name.clone(),
            profile: Self::KIND.to_string(),
            stats: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

pub struct NullProfileFactory;

impl ProfileFactory for NullProfileFactory {
    fn kind(&self) -> &str {
        NullProfile::KIND
    }

    fn create(&self, name: &str) -> Box<dyn DemandProfile> {
        Box::new(NullProfile::new(name))
    }

    fn restore(&self, stats: &DemandStats) -> DemandResult<Box<dyn DemandProfile>> {
        check_same_profile(&stats.name, NullProfile::KIND, stats)?;
        Ok(Box::new(NullProfile::new(stats.name.clone())))
    }
}
