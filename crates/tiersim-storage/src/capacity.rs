//! Read-only capacity view over the node registry

use crate::node_manager::NodeManager;
use tiersim_common::Tier;

/// Capacity queries by tier and across the cluster
///
/// `has_sufficient_capacity` is advisory: it reserves nothing, so callers
/// must re-check before mutating if the engine ever becomes concurrent.
#[derive(Clone, Copy, Debug)]
pub struct CapacityManager<'a> {
    nodes: &'a NodeManager,
}

impl<'a> CapacityManager<'a> {
    #[must_use]
    pub const fn new(nodes: &'a NodeManager) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn available_capacity(&self, tier: Tier) -> u64 {
        self.nodes.tier_available_capacity(tier)
    }

    #[must_use]
    pub fn used_capacity(&self, tier: Tier) -> u64 {
        self.nodes.tier_used_capacity(tier)
    }

    #[must_use]
    pub fn total_capacity(&self, tier: Tier) -> u64 {
        self.nodes.tier_total_capacity(tier)
    }

    #[must_use]
    pub fn has_sufficient_capacity(&self, tier: Tier, required_kb: u64) -> bool {
        self.available_capacity(tier) >= required_kb
    }

    #[must_use]
    pub fn system_available_capacity(&self) -> u64 {
        Tier::ALL.iter().map(|t| self.available_capacity(*t)).sum()
    }

    #[must_use]
    pub fn system_used_capacity(&self) -> u64 {
        Tier::ALL.iter().map(|t| self.used_capacity(*t)).sum()
    }

    #[must_use]
    pub fn system_total_capacity(&self) -> u64 {
        Tier::ALL.iter().map(|t| self.total_capacity(*t)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventSink, TracingSink};
    use std::sync::Arc;
    use tiersim_common::{Config, GB};

    #[test]
    fn test_capacity_queries() {
        let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
        let nodes = NodeManager::from_config(&Config::default(), &sink);
        let capacity = CapacityManager::new(&nodes);

        assert_eq!(capacity.total_capacity(Tier::Fast), 75 * GB);
        assert_eq!(capacity.available_capacity(Tier::Medium), 150 * GB);
        assert_eq!(capacity.used_capacity(Tier::Slow), 0);
        assert_eq!(capacity.system_total_capacity(), 450 * GB);
        assert_eq!(capacity.system_available_capacity(), 450 * GB);
        assert_eq!(capacity.system_used_capacity(), 0);

        assert!(capacity.has_sufficient_capacity(Tier::Fast, 75 * GB));
        assert!(!capacity.has_sufficient_capacity(Tier::Fast, 75 * GB + 1));
    }
}
