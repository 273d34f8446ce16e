//! Strategy selection for new and shipped demand profiles.
//!
//! Names are matched against an ordered list of regular expressions when a
//! profile is first created; the first match picks the strategy, otherwise
//! the default strategy is used. Shipped profiles carry their strategy key
//! in [`DemandStats::profile`], so reconstruction never guesses.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use reconfig_core::ReconfigConfig;

use crate::error::{DemandError, DemandResult};
use crate::profile::{DemandProfile, DemandStats, NullProfileFactory, ProfileFactory};
use crate::request_rate::RequestRateFactory;

/// Name pattern → strategy factory table.
#[derive(Clone)]
pub struct ProfileRegistry {
    factories: HashMap<String, Arc<dyn ProfileFactory>>,
    rules: Vec<(Regex, Arc<dyn ProfileFactory>)>,
    default: Arc<dyn ProfileFactory>,
}

impl ProfileRegistry {
    /// Create a registry whose default strategy is `default`.
    pub fn new(default: impl ProfileFactory + 'static) -> Self {
        let default: Arc<dyn ProfileFactory> = Arc::new(default);
        let mut factories = HashMap::new();
        factories.insert(default.kind().to_string(), Arc::clone(&default));
        Self {
            factories,
            rules: Vec::new(),
            default,
        }
    }

    /// Build the registry described by `config`: both built-in strategies
    /// registered, the configured default, and the configured rules.
    pub fn from_config(config: &ReconfigConfig) -> DemandResult<Self> {
        let mut registry = Self::new(RequestRateFactory::from_config(&config.request_rate)?)
            .register(NullProfileFactory)
            .with_default(&config.demand.default_profile)?;
        for rule in &config.demand.rules {
            registry = registry.with_rule(&rule.pattern, &rule.profile)?;
        }
        Ok(registry)
    }

    /// Make another strategy available to rules and reconstruction.
    pub fn register(mut self, factory: impl ProfileFactory + 'static) -> Self {
        self.factories
            .insert(factory.kind().to_string(), Arc::new(factory));
        self
    }

    /// Use the registered strategy `kind` for names no rule matches.
    pub fn with_default(mut self, kind: &str) -> DemandResult<Self> {
        self.default = self.lookup(kind)?;
        Ok(self)
    }

    /// Route names matching `pattern` to the registered strategy `kind`.
    pub fn with_rule(mut self, pattern: &str, kind: &str) -> DemandResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| DemandError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let factory = self.lookup(kind)?;
        self.rules.push((regex, factory));
        Ok(self)
    }

    /// Strategy key that a new profile for `name` would use.
    pub fn kind_for(&self, name: &str) -> &str {
        self.factory_for(name).kind()
    }

    /// A fresh, empty profile for `name`.
    pub fn create(&self, name: &str) -> Box<dyn DemandProfile> {
        let factory = self.factory_for(name);
        debug!(%name, profile = factory.kind(), "creating demand profile");
        factory.create(name)
    }

    /// Rebuild a profile from shipped statistics.
    pub fn restore(&self, stats: &DemandStats) -> DemandResult<Box<dyn DemandProfile>> {
        self.lookup(&stats.profile)?.restore(stats)
    }

    fn factory_for(&self, name: &str) -> &Arc<dyn ProfileFactory> {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(name))
            .map(|(_, factory)| factory)
            .unwrap_or(&self.default)
    }

    pub(crate) fn lookup(&self, kind: &str) -> DemandResult<Arc<dyn ProfileFactory>> {
        self.factories
            .get(kind)
            .cloned()
            .ok_or_else(|| DemandError::UnknownProfile(kind.to_string()))
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(RequestRateFactory::default()).register(NullProfileFactory)
    }
}

impl std::fmt::Debug for ProfileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRegistry")
            .field("default", &self.default.kind())
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|(regex, factory)| (regex.as_str(), factory.kind()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
