//! Consistent-hash ring over reconfigurators.
//!
//! Each reconfigurator owns `virtual_nodes` tokens at
//! `sha256("{node}#{i}")`; a name lands at `sha256(name)` and belongs to
//! the first token at or after it, wrapping around.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};
use tracing::debug;

use reconfig_core::config::{DEFAULT_RC_GROUP_SIZE, DEFAULT_VIRTUAL_NODES};
use reconfig_core::{NodeId, PartitionConfig, ServiceName};

use crate::error::{PartitionError, PartitionResult};

/// Deterministic token ring for a fixed reconfigurator set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistentHashRing {
    tokens: BTreeMap<u64, NodeId>,
    nodes: BTreeSet<NodeId>,
    virtual_nodes: usize,
    group_size: usize,
}

impl ConsistentHashRing {
    pub fn new<I, N>(reconfigurators: I, virtual_nodes: usize) -> PartitionResult<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        if virtual_nodes == 0 {
            return Err(PartitionError::NoVirtualNodes);
        }
        let nodes: BTreeSet<NodeId> = reconfigurators.into_iter().map(Into::into).collect();
        if nodes.is_empty() {
            return Err(PartitionError::NoReconfigurators);
        }

        let mut tokens = BTreeMap::new();
        for node in &nodes {
            for i in 0..virtual_nodes {
                // On the (astronomically unlikely) collision the smaller
                // node id keeps the token.
                tokens
                    .entry(token(format!("{node}#{i}").as_bytes()))
                    .or_insert_with(|| node.clone());
            }
        }
        debug!(
            reconfigurators = nodes.len(),
            tokens = tokens.len(),
            "built consistent hash ring"
        );
        Ok(Self {
            tokens,
            nodes,
            virtual_nodes,
            group_size: DEFAULT_RC_GROUP_SIZE,
        })
    }

    /// Ring with the default number of tokens per reconfigurator.
    pub fn with_default_tokens<I, N>(reconfigurators: I) -> PartitionResult<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self::new(reconfigurators, DEFAULT_VIRTUAL_NODES)
    }

    pub fn from_config<I, N>(reconfigurators: I, config: &PartitionConfig) -> PartitionResult<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Ok(Self::new(reconfigurators, config.virtual_nodes)?.with_group_size(config.rc_group_size))
    }

    /// Set the replica-group size used by [`rc_group_default`](Self::rc_group_default).
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.max(1);
        self
    }

    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// The reconfigurator that owns `name`.
    pub fn owner(&self, name: &str) -> &NodeId {
        self.walk(name)
            .next()
            .unwrap_or_else(|| unreachable!("ring is never empty"))
    }

    /// The first `size` distinct reconfigurators clockwise from `name`,
    /// owner first. Capped at the number of reconfigurators.
    pub fn rc_group(&self, name: &str, size: usize) -> Vec<NodeId> {
        let size = size.min(self.nodes.len());
        let mut group: Vec<NodeId> = Vec::with_capacity(size);
        for node in self.walk(name) {
            if group.len() == size {
                break;
            }
            if !group.contains(node) {
                group.push(node.clone());
            }
        }
        group
    }

    /// [`rc_group`](Self::rc_group) with the configured group size.
    pub fn rc_group_default(&self, name: &str) -> Vec<NodeId> {
        self.rc_group(name, self.group_size)
    }

    /// Partition `names` by owner.
    ///
    /// The subsets are pairwise disjoint and their union is exactly the
    /// input; reconfigurators that own none of the names are absent.
    pub fn split_into_groups<I, S>(&self, names: I) -> BTreeMap<NodeId, BTreeSet<ServiceName>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: BTreeMap<NodeId, BTreeSet<ServiceName>> = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            groups
                .entry(self.owner(name).clone())
                .or_default()
                .insert(name.to_string());
        }
        debug!(groups = groups.len(), "split names into reconfigurator groups");
        groups
    }

    /// Tokens clockwise from `name`'s position, wrapping once.
    fn walk(&self, name: &str) -> impl Iterator<Item = &NodeId> {
        let at = token(name.as_bytes());
        self.tokens
            .range(at..)
            .chain(self.tokens.range(..at))
            .map(|(_, node)| node)
    }
}

/// Owner of `name` among `reconfigurators`.
pub fn owner(name: &str, reconfigurators: &BTreeSet<NodeId>) -> PartitionResult<NodeId> {
    let ring = ConsistentHashRing::with_default_tokens(reconfigurators.iter().cloned())?;
    Ok(ring.owner(name).clone())
}

/// Partition `names` by owner among `reconfigurators`.
pub fn split_into_groups<I, S>(
    names: I,
    reconfigurators: &BTreeSet<NodeId>,
) -> PartitionResult<BTreeMap<NodeId, BTreeSet<ServiceName>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ring = ConsistentHashRing::with_default_tokens(reconfigurators.iter().cloned())?;
    Ok(ring.split_into_groups(names))
}

/// Ring position: the first eight bytes of the SHA-256 digest.
fn token(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECONFIGURATORS: [&str; 5] = ["RC43", "RC22", "RC78", "RC21", "RC143"];

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("someName{i}")).collect()
    }

    fn rc_set(nodes: &[&str]) -> BTreeSet<NodeId> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn split_is_disjoint_and_complete() {
        let input = names(1000);
        let groups = split_into_groups(&input, &rc_set(&RECONFIGURATORS)).unwrap();

        let total: usize = groups.values().map(BTreeSet::len).sum();
        assert_eq!(total, 1000);

        let union: BTreeSet<String> = groups.values().flatten().cloned().collect();
        let expected: BTreeSet<String> = input.iter().cloned().collect();
        assert_eq!(union, expected);

        for group in groups.keys() {
            assert!(RECONFIGURATORS.contains(&group.as_str()));
        }
    }

    #[test]
    fn split_is_deterministic() {
        let input = names(1000);
        let rcs = rc_set(&RECONFIGURATORS);
        let first = split_into_groups(&input, &rcs).unwrap();
        let second = split_into_groups(input.iter().rev(), &rcs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn every_reconfigurator_gets_a_share() {
        let groups = split_into_groups(names(1000), &rc_set(&RECONFIGURATORS)).unwrap();
        assert_eq!(groups.len(), 5);
        for members in groups.values() {
            assert!(members.len() > 50, "skewed share: {}", members.len());
        }
    }

    #[test]
    fn empty_reconfigurator_set_is_an_error() {
        let err = split_into_groups(names(3), &BTreeSet::new()).unwrap_err();
        assert_eq!(err, PartitionError::NoReconfigurators);
        assert_eq!(
            owner("a", &BTreeSet::new()).unwrap_err(),
            PartitionError::NoReconfigurators
        );
        assert_eq!(
            ConsistentHashRing::new(["RC0"], 0).unwrap_err(),
            PartitionError::NoVirtualNodes
        );
    }

    #[test]
    fn adding_a_reconfigurator_only_moves_names_to_it() {
        let before = ConsistentHashRing::with_default_tokens(RECONFIGURATORS).unwrap();
        let mut grown: Vec<&str> = RECONFIGURATORS.to_vec();
        grown.push("RC7");
        let after = ConsistentHashRing::with_default_tokens(grown).unwrap();

        let mut moved = 0;
        for name in names(1000) {
            let (old, new) = (before.owner(&name), after.owner(&name));
            if old != new {
                assert_eq!(new, "RC7");
                moved += 1;
            }
        }
        // Roughly a sixth of the names should move, never a reshuffle.
        assert!(moved > 0 && moved < 400, "moved {moved}");
    }

    #[test]
    fn removing_a_reconfigurator_only_moves_its_names() {
        let before = ConsistentHashRing::with_default_tokens(RECONFIGURATORS).unwrap();
        let after =
            ConsistentHashRing::with_default_tokens(RECONFIGURATORS.iter().filter(|n| **n != "RC78").copied())
                .unwrap();

        for name in names(1000) {
            let (old, new) = (before.owner(&name), after.owner(&name));
            if old != "RC78" {
                assert_eq!(old, new);
            } else {
                assert_ne!(new, "RC78");
            }
        }
    }

    #[test]
    fn rc_group_is_distinct_and_led_by_owner() {
        let ring = ConsistentHashRing::with_default_tokens(RECONFIGURATORS).unwrap();
        for name in names(50) {
            let group = ring.rc_group(&name, 3);
            assert_eq!(group.len(), 3);
            assert_eq!(&group[0], ring.owner(&name));
            let distinct: BTreeSet<&NodeId> = group.iter().collect();
            assert_eq!(distinct.len(), 3);
        }
        assert_eq!(ring.rc_group("x", 10).len(), 5);
    }

    #[test]
    fn rc_group_default_follows_config() {
        let config = PartitionConfig {
            virtual_nodes: 16,
            rc_group_size: 2,
        };
        let ring = ConsistentHashRing::from_config(RECONFIGURATORS, &config).unwrap();
        assert_eq!(ring.virtual_nodes(), 16);
        assert_eq!(ring.group_size(), 2);
        for name in names(20) {
            assert_eq!(ring.rc_group_default(&name), ring.rc_group(&name, 2));
        }

        let default = ConsistentHashRing::with_default_tokens(RECONFIGURATORS).unwrap();
        assert_eq!(default.rc_group_default("x").len(), DEFAULT_RC_GROUP_SIZE);
    }

    #[test]
    fn owner_matches_free_function() {
        let ring = ConsistentHashRing::with_default_tokens(RECONFIGURATORS).unwrap();
        let rcs = rc_set(&RECONFIGURATORS);
        for name in names(20) {
            assert_eq!(ring.owner(&name), &owner(&name, &rcs).unwrap());
        }
    }

    #[test]
    fn single_reconfigurator_owns_everything() {
        let ring = ConsistentHashRing::new(["RC0"], 1).unwrap();
        let groups = ring.split_into_groups(names(100));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["RC0"].len(), 100);
    }
}
