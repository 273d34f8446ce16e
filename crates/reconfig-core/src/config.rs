//! reconfig.toml configuration parser.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! default_policy = "DEFAULT"
//!
//! [demand]
//! max_size = 100000
//! pluck_size = 100
//! report_interval = "30s"
//! default_profile = "request-rate"
//!
//! [[demand.rules]]
//! pattern = "^quiet-"
//! profile = "null"
//!
//! [request_rate]
//! report_threshold = 100
//! min_requests_before_reconfigure = 1000
//! reconfigure_cooldown = "60s"
//! max_tracked_senders = 32
//!
//! [partition]
//! virtual_nodes = 64
//! rc_group_size = 3
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{ReconfigurationPolicy, install_default_policy, parse_duration};

pub const DEFAULT_MAX_SIZE: usize = 100_000;
pub const DEFAULT_PLUCK_SIZE: usize = 100;
pub const DEFAULT_VIRTUAL_NODES: usize = 64;
pub const DEFAULT_RC_GROUP_SIZE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconfigConfig {
    pub default_policy: ReconfigurationPolicy,
    pub demand: DemandConfig,
    pub request_rate: RequestRateConfig,
    pub partition: PartitionConfig,
}

/// Limits and strategy selection for the demand profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    /// Table size at which `trim` starts evicting.
    pub max_size: usize,
    /// Number of profiles evicted per `trim`.
    pub pluck_size: usize,
    /// How often the reporter trims and ships profiles.
    pub report_interval: String,
    /// Strategy used when no rule matches a name.
    pub default_profile: String,
    /// Name pattern → strategy rules, first match wins.
    pub rules: Vec<ProfileRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRule {
    /// Regular expression matched against the service name.
    pub pattern: String,
    /// Registry key of the strategy to use.
    pub profile: String,
}

/// Parameters of the built-in request-rate strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestRateConfig {
    /// Report after this many requests since the previous report.
    pub report_threshold: u64,
    /// Minimum total requests before a placement change is proposed.
    pub min_requests_before_reconfigure: u64,
    /// Quiet period after a reconfiguration (e.g. "60s").
    pub reconfigure_cooldown: String,
    /// Upper bound on distinct senders remembered per name.
    pub max_tracked_senders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Ring tokens per reconfigurator.
    pub virtual_nodes: usize,
    /// Reconfigurators replicating each name's record.
    pub rc_group_size: usize,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            pluck_size: DEFAULT_PLUCK_SIZE,
            report_interval: "30s".to_string(),
            default_profile: "request-rate".to_string(),
            rules: Vec::new(),
        }
    }
}

impl Default for RequestRateConfig {
    fn default() -> Self {
        Self {
            report_threshold: 100,
            min_requests_before_reconfigure: 1000,
            reconfigure_cooldown: "60s".to_string(),
            max_tracked_senders: 32,
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            rc_group_size: DEFAULT_RC_GROUP_SIZE,
        }
    }
}

impl DemandConfig {
    pub fn report_interval(&self) -> CoreResult<Duration> {
        parse_duration(&self.report_interval)
    }
}

impl RequestRateConfig {
    pub fn reconfigure_cooldown(&self) -> CoreResult<Duration> {
        parse_duration(&self.reconfigure_cooldown)
    }
}

impl ReconfigConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(?path, "configuration loaded");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ReconfigConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check limits and durations without touching any global state.
    pub fn validate(&self) -> CoreResult<()> {
        if self.demand.max_size == 0 {
            return Err(CoreError::InvalidConfig("demand.max_size must be positive".into()));
        }
        if self.demand.pluck_size == 0 {
            return Err(CoreError::InvalidConfig("demand.pluck_size must be positive".into()));
        }
        if self.request_rate.report_threshold == 0 {
            return Err(CoreError::InvalidConfig(
                "request_rate.report_threshold must be positive".into(),
            ));
        }
        if self.partition.virtual_nodes == 0 {
            return Err(CoreError::InvalidConfig(
                "partition.virtual_nodes must be positive".into(),
            ));
        }
        if self.partition.rc_group_size == 0 {
            return Err(CoreError::InvalidConfig(
                "partition.rc_group_size must be positive".into(),
            ));
        }
        self.demand.report_interval()?;
        self.request_rate.reconfigure_cooldown()?;
        Ok(())
    }

    /// Make `default_policy` the process-wide default for create requests.
    pub fn install_default_policy(&self) -> bool {
        install_default_policy(self.default_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ReconfigConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconfigConfig::default());
        assert_eq!(config.demand.max_size, 100_000);
        assert_eq!(config.demand.pluck_size, 100);
        assert_eq!(config.default_policy, ReconfigurationPolicy::Default);
    }

    #[test]
    fn parse_full_document() {
        let toml_str = r#"
default_policy = "REPLICATE_ALL"

[demand]
max_size = 500
pluck_size = 10
report_interval = "5s"

[[demand.rules]]
pattern = "^quiet-"
profile = "null"

[request_rate]
report_threshold = 3
reconfigure_cooldown = "2m"

[partition]
virtual_nodes = 8
"#;
        let config = ReconfigConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.default_policy, ReconfigurationPolicy::ReplicateAll);
        assert_eq!(config.demand.max_size, 500);
        assert_eq!(config.demand.rules.len(), 1);
        assert_eq!(config.demand.rules[0].profile, "null");
        assert_eq!(config.demand.default_profile, "request-rate");
        assert_eq!(config.request_rate.report_threshold, 3);
        assert_eq!(
            config.request_rate.reconfigure_cooldown().unwrap(),
            Duration::from_secs(120)
        );
        assert_eq!(config.partition.virtual_nodes, 8);
        assert_eq!(config.partition.rc_group_size, 3);
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(ReconfigConfig::from_toml_str("[demand]\npluck_size = 0\n").is_err());
        assert!(ReconfigConfig::from_toml_str("[partition]\nvirtual_nodes = 0\n").is_err());
    }

    #[test]
    fn rejects_bad_duration() {
        let err = ReconfigConfig::from_toml_str("[demand]\nreport_interval = \"often\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = ReconfigConfig::default();
        config.demand.rules.push(ProfileRule {
            pattern: "^batch-".to_string(),
            profile: "null".to_string(),
        });
        let text = config.to_toml_string().unwrap();
        let back = ReconfigConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[demand]\nmax_size = 42").unwrap();
        let config = ReconfigConfig::from_file(file.path()).unwrap();
        assert_eq!(config.demand.max_size, 42);
    }
}
