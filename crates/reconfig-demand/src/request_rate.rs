//! Request-rate demand strategy.
//!
//! Counts requests per name and remembers which client addresses sent
//! them. Reports upstream every `report_threshold` requests. Proposes a
//! placement that favours active replicas co-located with the busiest
//! senders, keeping the replica count unchanged, and then stays quiet for
//! `reconfigure_cooldown`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use reconfig_core::{ActiveSet, ClusterInfo, RequestRateConfig, ServiceName, ServiceRequest};

use crate::error::{DemandError, DemandResult};
use crate::profile::{DemandProfile, DemandStats, ProfileFactory, check_same_profile};

/// Weight of the newest sample in the inter-arrival moving average.
const EWMA_ALPHA: f64 = 0.125;

/// Tunables shared by all profiles built by one factory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateParams {
    pub report_threshold: u64,
    pub min_requests_before_reconfigure: u64,
    pub reconfigure_cooldown: Duration,
    pub max_tracked_senders: usize,
}

impl RateParams {
    pub fn from_config(config: &RequestRateConfig) -> DemandResult<Self> {
        Ok(Self {
            report_threshold: config.report_threshold.max(1),
            min_requests_before_reconfigure: config.min_requests_before_reconfigure,
            reconfigure_cooldown: config.reconfigure_cooldown()?,
            max_tracked_senders: config.max_tracked_senders.max(1),
        })
    }
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            report_threshold: 100,
            min_requests_before_reconfigure: 1000,
            reconfigure_cooldown: Duration::from_secs(60),
            max_tracked_senders: 32,
        }
    }
}

/// The exported statistics of a [`RequestRateProfile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RateStats {
    /// Requests since the last report.
    num_requests: u64,
    num_total_requests: u64,
    /// Moving average of the gap between requests, in milliseconds.
    inter_arrival_ms: f64,
    last_request_ms: u64,
    last_reconfigured_ms: Option<u64>,
    num_reconfigurations: u64,
    /// Sender IP → request count.
    senders: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
pub struct RequestRateProfile {
    name: ServiceName,
    params: RateParams,
    stats: RateStats,
}

impl RequestRateProfile {
    pub const KIND: &'static str = "request-rate";

    pub fn new(name: impl Into<ServiceName>, params: RateParams) -> Self {
        Self {
            name: name.into(),
            params,
            stats: RateStats::default(),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.stats.num_total_requests
    }

    /// Average gap between requests, if at least two were seen.
    pub fn inter_arrival(&self) -> Option<Duration> {
        if self.stats.num_total_requests < 2 {
            return None;
        }
        Duration::try_from_secs_f64(self.stats.inter_arrival_ms / 1000.0).ok()
    }

    fn register(&mut self, sender: IpAddr, now: u64) {
        let stats = &mut self.stats;
        if stats.num_total_requests > 0 {
            let sample = now.saturating_sub(stats.last_request_ms) as f64;
            stats.inter_arrival_ms = if stats.num_total_requests == 1 {
                sample
            } else {
                (1.0 - EWMA_ALPHA) * stats.inter_arrival_ms + EWMA_ALPHA * sample
            };
        }
        stats.num_requests = stats.num_requests.saturating_add(1);
        stats.num_total_requests = stats.num_total_requests.saturating_add(1);
        stats.last_request_ms = now;
        let tally = stats.senders.entry(sender.to_string()).or_insert(0);
        *tally = tally.saturating_add(1);
        self.bound_senders();
    }

    /// Drop the least frequent senders beyond `max_tracked_senders`.
    fn bound_senders(&mut self) {
        while self.stats.senders.len() > self.params.max_tracked_senders {
            let victim = self
                .stats
                .senders
                .iter()
                .min_by_key(|(_, count)| **count)
                .map(|(ip, _)| ip.clone());
            match victim {
                Some(ip) => {
                    self.stats.senders.remove(&ip);
                }
                None => break,
            }
        }
    }

    fn in_cooldown(&self, now: u64) -> bool {
        let cooldown = self.params.reconfigure_cooldown.as_millis() as u64;
        self.stats
            .last_reconfigured_ms
            .is_some_and(|at| now.saturating_sub(at) < cooldown)
    }

    /// Senders ordered busiest first.
    fn ranked_senders(&self) -> Vec<IpAddr> {
        let mut senders: Vec<(&String, &u64)> = self.stats.senders.iter().collect();
        senders.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        senders
            .into_iter()
            .filter_map(|(ip, _)| ip.parse().ok())
            .collect()
    }
}

impl DemandProfile for RequestRateProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn should_report(
        &mut self,
        _request: &dyn ServiceRequest,
        sender: IpAddr,
        _cluster: &dyn ClusterInfo,
    ) -> bool {
        self.register(sender, epoch_millis());
        if self.stats.num_requests >= self.params.report_threshold {
            self.stats.num_requests = 0;
            return true;
        }
        false
    }

    fn reconfigure(
        &mut self,
        current: &ActiveSet,
        cluster: &dyn ClusterInfo,
    ) -> Option<ActiveSet> {
        if self.in_cooldown(epoch_millis()) {
            return None;
        }
        if self.stats.num_total_requests < self.params.min_requests_before_reconfigure {
            return None;
        }

        let candidates = cluster.active_replicas();
        if candidates.is_empty() {
            return None;
        }
        let target = current.len().max(1);
        let mut chosen = ActiveSet::new();

        // Replicas co-located with the busiest senders first.
        for sender in self.ranked_senders() {
            if chosen.len() >= target {
                break;
            }
            let local = candidates
                .iter()
                .find(|node| {
                    !chosen.contains(*node)
                        && cluster
                            .replica_address(node)
                            .is_some_and(|addr| addr.ip() == sender)
                })
                .cloned();
            if let Some(node) = local {
                chosen.insert(node);
            }
        }

        // Then keep surviving current replicas, then anything active.
        let fill = current
            .iter()
            .filter(|node| candidates.contains(*node))
            .chain(candidates.iter().filter(|node| !current.contains(*node)));
        for node in fill {
            if chosen.len() >= target {
                break;
            }
            chosen.insert(node.clone());
        }

        if chosen.is_empty() || chosen == *current {
            return None;
        }
        debug!(
            name = %self.name,
            from = ?current,
            to = ?chosen,
            total_requests = self.stats.num_total_requests,
            "request-rate profile proposes new placement"
        );
        Some(chosen)
    }

    fn just_reconfigured(&mut self) {
        self.stats.last_reconfigured_ms = Some(epoch_millis());
        self.stats.num_reconfigurations = self.stats.num_reconfigurations.saturating_add(1);
    }

    fn combine(&mut self, other: &DemandStats) -> DemandResult<()> {
        check_same_profile(&self.name, Self::KIND, other)?;
        let other = parse_stats(other)?;
        let stats = &mut self.stats;

        let total = stats.num_total_requests.saturating_add(other.num_total_requests);
        if total > 0 {
            stats.inter_arrival_ms = (stats.inter_arrival_ms * stats.num_total_requests as f64
                + other.inter_arrival_ms * other.num_total_requests as f64)
                / total as f64;
        }
        stats.num_requests = stats.num_requests.saturating_add(other.num_requests);
        stats.num_total_requests = total;
        stats.last_request_ms = stats.last_request_ms.max(other.last_request_ms);
        stats.last_reconfigured_ms = stats.last_reconfigured_ms.max(other.last_reconfigured_ms);
        stats.num_reconfigurations = stats.num_reconfigurations.max(other.num_reconfigurations);
        for (ip, count) in other.senders {
            let tally = stats.senders.entry(ip).or_insert(0);
            *tally = tally.saturating_add(count);
        }
        self.bound_senders();
        Ok(())
    }

    fn stats(&self) -> DemandStats {
        DemandStats {
            name: self.name.clone(),
            profile: Self::KIND.to_string(),
            stats: serde_json::to_value(&self.stats).unwrap_or(serde_json::Value::Null),
        }
    }
}

fn parse_stats(stats: &DemandStats) -> DemandResult<RateStats> {
    let parsed: RateStats =
        serde_json::from_value(stats.stats.clone()).map_err(|e| DemandError::MalformedStats {
            name: stats.name.clone(),
            reason: e.to_string(),
        })?;
    let gap = parsed.inter_arrival_ms;
    if !gap.is_finite() || gap < 0.0 {
        return Err(DemandError::MalformedStats {
            name: stats.name.clone(),
            reason: format!("inter_arrival_ms must be finite and non-negative, got {gap}"),
        });
    }
    Ok(parsed)
}

/// Builds [`RequestRateProfile`]s sharing one set of [`RateParams`].
#[derive(Debug, Clone, Default)]
pub struct RequestRateFactory {
    params: RateParams,
}

impl RequestRateFactory {
    pub fn new(params: RateParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &RequestRateConfig) -> DemandResult<Self> {
        Ok(Self::new(RateParams::from_config(config)?))
    }
}

impl ProfileFactory for RequestRateFactory {
    fn kind(&self) -> &str {
        RequestRateProfile::KIND
    }

    fn create(&self, name: &str) -> Box<dyn DemandProfile> {
        Box::new(RequestRateProfile::new(name, self.params))
    }

    fn restore(&self, stats: &DemandStats) -> DemandResult<Box<dyn DemandProfile>> {
        check_same_profile(&stats.name, RequestRateProfile::KIND, stats)?;
        let mut profile = RequestRateProfile::new(stats.name.clone(), self.params);
        profile.stats = parse_stats(stats)?;
        Ok(Box::new(profile))
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
