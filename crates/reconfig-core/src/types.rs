//! Shared types used across the reconfiguration crates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Globally unique name of one replicated state-machine instance.
pub type ServiceName = String;

/// Identifier of an active replica or a reconfigurator.
pub type NodeId = String;

/// A placement of a service: the nodes currently hosting its replicas.
///
/// Ordered so that two placements compare and log deterministically.
pub type ActiveSet = BTreeSet<NodeId>;

/// Numeric identifier of an application request type.
pub type RequestTypeId = u32;

// ── Policy ────────────────────────────────────────────────────────

/// What happens to a service's replicas when the set of active replicas
/// in the cluster changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconfigurationPolicy {
    /// Leave placement to the service's demand profile.
    #[default]
    Default,
    /// Replicate the service at every active replica.
    ReplicateAll,
}

impl ReconfigurationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconfigurationPolicy::Default => "DEFAULT",
            ReconfigurationPolicy::ReplicateAll => "REPLICATE_ALL",
        }
    }
}

impl fmt::Display for ReconfigurationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconfigurationPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT" => Ok(ReconfigurationPolicy::Default),
            "REPLICATE_ALL" => Ok(ReconfigurationPolicy::ReplicateAll),
            other => Err(CoreError::UnknownPolicy(other.to_string())),
        }
    }
}

static DEFAULT_POLICY: OnceLock<ReconfigurationPolicy> = OnceLock::new();

/// Install the process-wide default policy.
///
/// Only the first call wins; returns false if a default was already set.
pub fn install_default_policy(policy: ReconfigurationPolicy) -> bool {
    DEFAULT_POLICY.set(policy).is_ok()
}

/// The policy applied to create requests that don't name one.
pub fn default_policy() -> ReconfigurationPolicy {
    DEFAULT_POLICY.get().copied().unwrap_or_default()
}

// ── Requests ──────────────────────────────────────────────────────

/// A client request as seen by demand accounting and applications.
pub trait ServiceRequest {
    /// Name of the service this request targets. `None` for the reserved
    /// no-op request.
    fn service_name(&self) -> Option<&str>;

    /// Application-level request type.
    fn request_type(&self) -> RequestTypeId;
}

// ── Durations ─────────────────────────────────────────────────────

/// Parse a duration string like "250ms", "30s", "5m" or "1h".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> CoreResult<Duration> {
    let s = s.trim();
    let invalid = || CoreError::InvalidDuration(s.to_string());
    let (digits, scale_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        (s, 1_000)
    };
    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    value
        .checked_mul(scale_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}
