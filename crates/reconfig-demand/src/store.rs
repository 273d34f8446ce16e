//! DemandProfileStore — the bounded per-name demand table.
//!
//! One mutex guards the whole table and every public method takes it
//! exactly once, so fetch-or-create, mutate, and decide never interleave
//! with another operation. Nothing inside the lock performs I/O.
//!
//! Callers never get references into the table: `pluck_demand_profile`
//! and `combine` hand out copies rebuilt from exported statistics.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use reconfig_core::config::{DEFAULT_MAX_SIZE, DEFAULT_PLUCK_SIZE};
use reconfig_core::{ActiveSet, ClusterInfo, DemandConfig, ServiceName, ServiceRequest};

use crate::error::DemandResult;
use crate::profile::{DemandProfile, DemandStats};
use crate::registry::ProfileRegistry;

/// Thread-safe table of demand profiles keyed by service name.
pub struct DemandProfileStore {
    profiles: Mutex<HashMap<ServiceName, Box<dyn DemandProfile>>>,
    registry: Arc<ProfileRegistry>,
    cluster: Arc<dyn ClusterInfo>,
    max_size: usize,
    pluck_size: usize,
}

impl DemandProfileStore {
    /// Create a store with the default limits (100 000 names, 100 per trim).
    pub fn new(registry: Arc<ProfileRegistry>, cluster: Arc<dyn ClusterInfo>) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            registry,
            cluster,
            max_size: DEFAULT_MAX_SIZE,
            pluck_size: DEFAULT_PLUCK_SIZE,
        }
    }

    /// Create a store with the limits from `config`.
    pub fn from_config(
        config: &DemandConfig,
        registry: Arc<ProfileRegistry>,
        cluster: Arc<dyn ClusterInfo>,
    ) -> Self {
        Self::new(registry, cluster).with_limits(config.max_size, config.pluck_size)
    }

    /// Override the trim threshold and the number of profiles evicted per trim.
    pub fn with_limits(mut self, max_size: usize, pluck_size: usize) -> Self {
        self.max_size = max_size.max(1);
        self.pluck_size = pluck_size.max(1);
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn pluck_size(&self) -> usize {
        self.pluck_size
    }

    /// Record `request` from `sender` and decide whether to report demand.
    ///
    /// Creates the profile for the request's name on first sight. The
    /// reserved no-op request carries no name and is not recorded.
    pub fn record_and_should_report(&self, request: &dyn ServiceRequest, sender: IpAddr) -> bool {
        let Some(name) = request.service_name() else {
            return false;
        };
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(name.to_string())
            .or_insert_with(|| self.registry.create(name));
        let report = profile.should_report(request, sender, self.cluster.as_ref());
        if report {
            debug!(%name, %sender, "demand report threshold reached");
        }
        report
    }

    /// Ask the profile for `name` whether to move away from `current`,
    /// without committing to it. Unknown names yield `None`.
    pub fn reconfigure(&self, name: &str, current: &ActiveSet) -> Option<ActiveSet> {
        let mut profiles = self.profiles.lock();
        profiles
            .get_mut(name)?
            .reconfigure(current, self.cluster.as_ref())
    }

    /// Atomically decide on and commit to a placement change.
    ///
    /// Returns the proposed placement after putting the profile into its
    /// cool-down, or `current` unchanged if no change is warranted or the
    /// name is unknown.
    pub fn test_and_set_reconfigure(
        &self,
        name: &str,
        current: &ActiveSet,
        cluster: &dyn ClusterInfo,
    ) -> ActiveSet {
        let mut profiles = self.profiles.lock();
        let Some(profile) = profiles.get_mut(name) else {
            return current.clone();
        };
        match profile.reconfigure(current, cluster) {
            Some(proposed) => {
                profile.just_reconfigured();
                info!(%name, from = ?current, to = ?proposed, "reconfiguration triggered");
                proposed
            }
            None => current.clone(),
        }
    }

    /// Merge a profile shipped from elsewhere into the entry for its name,
    /// installing it if the name is new. Returns a copy of the result.
    ///
    /// Profiles whose strategy is not registered are rejected before the
    /// table is touched. A failed merge leaves the existing entry as is.
    pub fn combine(&self, update: Box<dyn DemandProfile>) -> DemandResult<Box<dyn DemandProfile>> {
        let factory = self.registry.lookup(update.kind())?;
        let name = update.name().to_string();
        let update_stats = update.stats();

        let merged = {
            let mut profiles = self.profiles.lock();
            match profiles.get_mut(&name) {
                Some(existing) => {
                    existing.combine(&update_stats)?;
                    existing.stats()
                }
                None => {
                    profiles.insert(name.clone(), update);
                    update_stats
                }
            }
        };
        debug!(%name, "combined demand profile");
        factory.restore(&merged)
    }

    /// Evict profiles once the table reaches `max_size`.
    ///
    /// Removes `pluck_size` entries (more if the table overshot the limit,
    /// so that it ends strictly below `max_size`) and returns them for
    /// shipment. Below the limit this is a no-op.
    ///
    /// The size bound takes precedence over `pluck_size`: when the table
    /// has overshot `max_size`, more than `pluck_size` profiles are returned.
    pub fn trim(&self) -> Vec<Box<dyn DemandProfile>> {
        let mut profiles = self.profiles.lock();
        let len = profiles.len();
        if len < self.max_size {
            return Vec::new();
        }
        let count = self.pluck_size.max(len - self.max_size + 1).min(len);
        let victims: Vec<ServiceName> = profiles.keys().take(count).cloned().collect();
        let plucked: Vec<Box<dyn DemandProfile>> = victims
            .iter()
            .filter_map(|name| profiles.remove(name))
            .collect();
        info!(
            evicted = plucked.len(),
            remaining = profiles.len(),
            max_size = self.max_size,
            "trimmed demand profile table"
        );
        plucked
    }

    /// Take a copy of the profile for `name` and reset the entry.
    ///
    /// The copy is rebuilt from the profile's exported statistics and the
    /// table entry is replaced by a fresh empty profile. Unknown names
    /// yield `None`.
    pub fn pluck_demand_profile(&self, name: &str) -> DemandResult<Option<Box<dyn DemandProfile>>> {
        let mut profiles = self.profiles.lock();
        let Some(existing) = profiles.get(name) else {
            return Ok(None);
        };
        let copy = self.registry.restore(&existing.stats())?;
        profiles.insert(name.to_string(), self.registry.create(name));
        Ok(Some(copy))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.lock().contains_key(name)
    }

    /// Insert `profile` unless its name is already tracked.
    ///
    /// Returns true if the profile was inserted.
    pub fn put_if_empty(&self, profile: Box<dyn DemandProfile>) -> bool {
        let mut profiles = self.profiles.lock();
        if profiles.contains_key(profile.name()) {
            return false;
        }
        profiles.insert(profile.name().to_string(), profile);
        true
    }

    /// Install a shipped profile from its statistics, merging if present.
    pub fn combine_stats(
        &self,
        stats: &DemandStats,
    ) -> DemandResult<Box<dyn DemandProfile>> {
        let update = self.registry.restore(stats)?;
        self.combine(update)
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for DemandProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandProfileStore")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("pluck_size", &self.pluck_size)
            .finish()
    }
}
