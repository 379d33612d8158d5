//! Registry of storage nodes grouped by tier

use crate::events::EventSink;
use crate::medium::StorageMedium;
use crate::node::StorageNode;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tiersim_common::{Config, Error, NodeId, Result, Tier};
use tiersim_placement::{TierInfo, TierTopology};
use tracing::info;

/// Capacity totals of one tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierCapacity {
    pub available_capacity: u64,
    pub used_capacity: u64,
    pub total_capacity: u64,
}

/// Node registry with per-tier membership
#[derive(Debug, Default)]
pub struct NodeManager {
    nodes: HashMap<NodeId, StorageNode>,
    tiers: [Vec<NodeId>; 3],
}

impl NodeManager {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured node
    ///
    /// Nodes are named `<tier>_node_<i>` and their media
    /// `<tier>_medium_<i>_<j>`.
    #[must_use]
    pub fn from_config(config: &Config, sink: &Arc<dyn EventSink>) -> Self {
        let mut manager = Self::new();
        for tier in Tier::ALL {
            let kind = tier.medium_kind();
            let prefix = tier.as_lowercase();
            for i in 0..config.cluster.node_count(tier) {
                let media = (0..config.cluster.media_per_node)
                    .map(|j| {
                        StorageMedium::new(
                            format!("{prefix}_medium_{i}_{j}"),
                            kind,
                            config.medium(kind).clone(),
                        )
                    })
                    .collect();
                let node = StorageNode::new(
                    format!("{prefix}_node_{i}"),
                    tier,
                    config.tier(tier).clone(),
                    media,
                )
                .with_error_response_time(config.cluster.error_response_time_ms)
                .with_retry(config.retry.clone())
                .with_sink(Arc::clone(sink));
                manager.insert(node);
            }
        }
        info!(
            fast = manager.node_ids(Tier::Fast).len(),
            medium = manager.node_ids(Tier::Medium).len(),
            slow = manager.node_ids(Tier::Slow).len(),
            "storage nodes initialized"
        );
        manager
    }

    /// Register a node under its tier
    pub fn add_node(&mut self, node: StorageNode) -> Result<NodeId> {
        if self.nodes.contains_key(&node.id()) {
            return Err(Error::invalid_argument(format!(
                "node {} is already registered",
                node.id()
            )));
        }
        Ok(self.insert(node))
    }

    /// Unregister a node
    pub fn remove_node(&mut self, id: NodeId) -> Result<StorageNode> {
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        self.tiers[tier_index(node.tier())].retain(|n| *n != id);
        Ok(node)
    }

    fn insert(&mut self, node: StorageNode) -> NodeId {
        let id = node.id();
        self.tiers[tier_index(node.tier())].push(id);
        self.nodes.insert(id, node);
        id
    }

    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&StorageNode> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut StorageNode> {
        self.nodes.get_mut(&id)
    }

    /// Node lookup that fails with [`Error::NodeNotFound`]
    pub fn node(&self, id: NodeId) -> Result<&StorageNode> {
        self.get_node(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    /// Mutable node lookup that fails with [`Error::NodeNotFound`]
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut StorageNode> {
        self.get_node_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    /// Member ids of a tier in registration order
    #[must_use]
    pub fn node_ids(&self, tier: Tier) -> &[NodeId] {
        &self.tiers[tier_index(tier)]
    }

    /// Members of a tier in registration order
    pub fn nodes(&self, tier: Tier) -> impl Iterator<Item = &StorageNode> {
        self.node_ids(tier)
            .iter()
            .filter_map(move |id| self.nodes.get(id))
    }

    /// Every node, fastest tier first
    pub fn all_nodes(&self) -> impl Iterator<Item = &StorageNode> {
        Tier::ALL.into_iter().flat_map(move |tier| self.nodes(tier))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn tier_total_capacity(&self, tier: Tier) -> u64 {
        self.nodes(tier).map(StorageNode::total_capacity).sum()
    }

    #[must_use]
    pub fn tier_used_capacity(&self, tier: Tier) -> u64 {
        self.nodes(tier).map(StorageNode::used_capacity).sum()
    }

    #[must_use]
    pub fn tier_available_capacity(&self, tier: Tier) -> u64 {
        self.nodes(tier).map(StorageNode::available_space).sum()
    }

    /// Used fraction of a tier, 0 when the tier has no capacity
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self, tier: Tier) -> f64 {
        let total = self.tier_total_capacity(tier);
        if total == 0 {
            0.0
        } else {
            self.tier_used_capacity(tier) as f64 / total as f64
        }
    }

    #[must_use]
    pub fn tier_capacity(&self, tier: Tier) -> TierCapacity {
        TierCapacity {
            available_capacity: self.tier_available_capacity(tier),
            used_capacity: self.tier_used_capacity(tier),
            total_capacity: self.tier_total_capacity(tier),
        }
    }

    /// Capacity totals of every tier, fastest first
    #[must_use]
    pub fn tier_capacity_info(&self) -> Vec<(Tier, TierCapacity)> {
        Tier::ALL
            .into_iter()
            .map(|tier| (tier, self.tier_capacity(tier)))
            .collect()
    }

    /// Flat read cost of the tier's first node, 0 for an empty tier
    #[must_use]
    pub fn cost(&self, tier: Tier) -> f64 {
        self.nodes(tier).next().map_or(0.0, |n| n.config().read_cost)
    }

    /// Process time of the tier's first node, 0 for an empty tier
    #[must_use]
    pub fn process_time(&self, tier: Tier) -> f64 {
        self.nodes(tier)
            .next()
            .map_or(0.0, |n| n.config().process_time_ms)
    }

    /// Availability of the tier node with the most free space
    #[must_use]
    pub fn availability(&self, tier: Tier) -> f64 {
        self.nodes(tier)
            .reduce(|best, n| {
                if n.available_space() > best.available_space() {
                    n
                } else {
                    best
                }
            })
            .map_or(0.0, |n| n.config().availability)
    }

    /// Snapshot of every tier for placement strategies
    #[must_use]
    pub fn topology(&self) -> TierTopology {
        let mut topology = TierTopology::new();
        for tier in Tier::ALL {
            let capacity = self.tier_capacity(tier);
            topology.upsert(TierInfo {
                tier,
                node_count: self.node_ids(tier).len(),
                total_capacity: capacity.total_capacity,
                used_capacity: capacity.used_capacity,
                available_capacity: capacity.available_capacity,
                cost: self.cost(tier),
                process_time: self.process_time(tier),
                availability: self.availability(tier),
            });
        }
        topology
    }

    /// Clear every node's contents and counters
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
    }
}

const fn tier_index(tier: Tier) -> usize {
    match tier {
        Tier::Fast => 0,
        Tier::Medium => 1,
        Tier::Slow => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingSink;
    use tiersim_common::GB;

    fn sink() -> Arc<dyn EventSink> {
        Arc::new(TracingSink)
    }

    #[test]
    fn test_from_config_builds_named_nodes() {
        let mut config = Config::default();
        config.cluster.fast_nodes = 2;
        config.cluster.slow_nodes = 1;
        config.cluster.media_per_node = 2;
        let manager = NodeManager::from_config(&config, &sink());

        assert_eq!(manager.node_count(), 6);
        let names: Vec<_> = manager.nodes(Tier::Fast).map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["fast_node_0", "fast_node_1"]);

        let slow = manager.nodes(Tier::Slow).next().unwrap();
        let media: Vec<_> = slow.media().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(media, vec!["slow_medium_0_0", "slow_medium_0_1"]);
        assert_eq!(manager.tier_total_capacity(Tier::Slow), 150 * GB);
        assert_eq!(manager.tier_total_capacity(Tier::Fast), 100 * GB);
    }

    #[test]
    fn test_tier_parameters() {
        let manager = NodeManager::from_config(&Config::default(), &sink());
        assert!((manager.cost(Tier::Medium) - 0.000_000_1).abs() < 1e-15);
        assert!((manager.process_time(Tier::Slow) - 2000.0).abs() < f64::EPSILON);
        assert!((manager.availability(Tier::Fast) - 0.99).abs() < f64::EPSILON);
        assert!(manager.utilization(Tier::Fast).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_tier_is_zero() {
        let mut config = Config::default();
        config.cluster.medium_nodes = 0;
        let manager = NodeManager::from_config(&config, &sink());

        assert_eq!(manager.tier_capacity(Tier::Medium), TierCapacity::default());
        assert!(manager.utilization(Tier::Medium).abs() < f64::EPSILON);
        assert!(manager.cost(Tier::Medium).abs() < f64::EPSILON);

        let topology = manager.topology();
        assert_eq!(topology.get(Tier::Medium).node_count, 0);
        assert_eq!(topology.get(Tier::Fast).node_count, 3);
    }

    #[test]
    fn test_add_and_remove_node() {
        let mut manager = NodeManager::new();
        let config = Config::default();
        let node = StorageNode::new(
            "extra",
            Tier::Medium,
            config.tier(Tier::Medium).clone(),
            vec![StorageMedium::new(
                "extra_medium",
                Tier::Medium.medium_kind(),
                config.medium(Tier::Medium.medium_kind()).clone(),
            )],
        );
        let id = manager.add_node(node).unwrap();
        assert_eq!(manager.node_ids(Tier::Medium), &[id]);
        assert_eq!(manager.tier_total_capacity(Tier::Medium), 50 * GB);

        let removed = manager.remove_node(id).unwrap();
        assert_eq!(removed.name(), "extra");
        assert!(manager.node_ids(Tier::Medium).is_empty());
        assert!(manager.remove_node(id).unwrap_err().is_not_found());
        assert!(manager.node(id).is_err());
    }
}
