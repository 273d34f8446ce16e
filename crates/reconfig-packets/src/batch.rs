//! Splitting and chunking of batched creates.

use std::collections::{BTreeMap, BTreeSet};

use reconfig_core::{NodeId, ReconfigurationPolicy};
use reconfig_partition::ConsistentHashRing;
use tracing::debug;

use crate::create::{CreateServiceName, NameStates};
use crate::error::{PacketError, PacketResult};

impl CreateServiceName {
    /// One sub-request per reconfigurator group that owns part of this
    /// request. Sub-requests keep the sender, policy, and response flag,
    /// and carry only the failed creates that fall in their share.
    pub fn split_by_group(
        &self,
        ring: &ConsistentHashRing,
    ) -> PacketResult<BTreeMap<NodeId, CreateServiceName>> {
        if !self.is_batched() {
            let owner = ring.owner(&self.name).clone();
            return Ok(BTreeMap::from([(owner, self.clone())]));
        }

        let groups = ring.split_into_groups(self.name_states.keys());
        let mut out = BTreeMap::new();

        for (group, names) in groups {
            let share: NameStates = names
                .iter()
                .filter_map(|n| self.name_states.get(n).map(|s| (n.clone(), s.clone())))
                .collect();
            let mut sub = CreateServiceName::batch_with_policy(share, self.policy)?;
            sub.failed_creates = self
                .failed_creates
                .iter()
                .filter(|n| names.contains(*n))
                .cloned()
                .collect();
            sub.sender = self.sender;
            sub.response = self.response;
            out.insert(group, sub);
        }

        debug!(head = %self.name, size = self.size(), groups = out.len(), "split create by group");
        Ok(out)
    }
}

/// Cut `name_states` into batches of at most `batch_size` names.
pub fn make_batches(
    name_states: &NameStates,
    batch_size: usize,
    policy: ReconfigurationPolicy,
) -> PacketResult<Vec<CreateServiceName>> {
    if batch_size == 0 {
        return Err(PacketError::InvalidBatchSize);
    }

    let entries: Vec<(&String, &String)> = name_states.iter().collect();
    entries
        .chunks(batch_size)
        .map(|chunk| {
            let share = chunk
                .iter()
                .map(|(n, s)| ((*n).clone(), (*s).clone()))
                .collect();
            CreateServiceName::batch_with_policy(share, policy)
        })
        .collect()
}

/// Like [`make_batches`], but no batch spans two reconfigurator groups.
pub fn make_group_batches(
    name_states: &NameStates,
    batch_size: usize,
    policy: ReconfigurationPolicy,
    ring: &ConsistentHashRing,
) -> PacketResult<Vec<CreateServiceName>> {
    if batch_size == 0 {
        return Err(PacketError::InvalidBatchSize);
    }

    let mut by_group: BTreeMap<&NodeId, NameStates> = BTreeMap::new();
    for (name, state) in name_states {
        by_group
            .entry(ring.owner(name))
            .or_default()
            .insert(name.clone(), state.clone());
    }

    let mut batches = Vec::new();
    for (group, share) in &by_group {
        let chunked = make_batches(share, batch_size, policy)?;
        debug!(group = %group, names = share.len(), batches = chunked.len(), "group batches");
        batches.extend(chunked);
    }
    Ok(batches)
}

/// The reconfigurator groups a set of batches touch.
pub fn groups_of(batches: &[CreateServiceName], ring: &ConsistentHashRing) -> BTreeSet<NodeId> {
    batches
        .iter()
        .flat_map(|b| b.names())
        .map(|n| ring.owner(&n).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(n: usize) -> NameStates {
        (0..n).map(|i| (format!("svc-{i:04}"), format!("s{i}"))).collect()
    }

    fn ring() -> ConsistentHashRing {
        ConsistentHashRing::with_default_tokens(["RC0", "RC1", "RC2"]).unwrap()
    }

    #[test]
    fn make_batches_respects_size() {
        let batches = make_batches(&many(25), 10, ReconfigurationPolicy::Default).unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.size()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        let total: usize = sizes.iter().sum();
        assert_eq!(total, 25);
    }

    #[test]
    fn make_batches_rejects_zero() {
        assert!(matches!(
            make_batches(&many(3), 0, ReconfigurationPolicy::Default),
            Err(PacketError::InvalidBatchSize)
        ));
    }

    #[test]
    fn make_batches_empty_map_yields_nothing() {
        let batches = make_batches(&NameStates::new(), 5, ReconfigurationPolicy::Default).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn group_batches_never_span_groups() {
        let ring = ring();
        let batches =
            make_group_batches(&many(300), 40, ReconfigurationPolicy::ReplicateAll, &ring).unwrap();

        let mut seen = 0;
        for batch in &batches {
            assert!(batch.size() <= 40);
            assert_eq!(batch.policy(), ReconfigurationPolicy::ReplicateAll);
            assert_eq!(groups_of(std::slice::from_ref(batch), &ring).len(), 1);
            seen += batch.size();
        }
        assert_eq!(seen, 300);
    }

    #[test]
    fn split_single_yields_owner() {
        let ring = ring();
        let req = CreateServiceName::new("solo", "x");
        let split = req.split_by_group(&ring).unwrap();
        assert_eq!(split.len(), 1);
        let (owner, sub) = split.into_iter().next().unwrap();
        assert_eq!(&owner, ring.owner("solo"));
        assert_eq!(sub, req);
    }

    #[test]
    fn split_carries_failed_creates_to_their_group() {
        let ring = ring();
        let req = CreateServiceName::batch(many(50)).unwrap();
        let failed: BTreeSet<String> = ["svc-0003", "svc-0017"].iter().map(|s| s.to_string()).collect();
        let resp = CreateServiceName::response_to(&req, req.name_states().clone(), failed.clone());

        let split = resp.split_by_group(&ring).unwrap();
        let mut carried = BTreeSet::new();
        for (owner, sub) in &split {
            assert!(sub.is_response());
            for name in sub.failed_creates() {
                assert_eq!(ring.owner(name), owner);
                carried.insert(name.clone());
            }
        }
        assert_eq!(carried, failed);
    }
}
