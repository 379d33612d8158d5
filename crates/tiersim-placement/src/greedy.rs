//! Greedy tier selection heuristics

use crate::policy::{PlacementStrategy, first_feasible, required_capacity};
use crate::topology::TierTopology;
use tiersim_common::{Result, Tier};
use tracing::debug;

/// Walks a fixed tier priority and takes the first tier with room
#[derive(Clone, Debug)]
pub struct PriorityGreedy {
    name: &'static str,
    order: [Tier; 3],
    replication_factor: usize,
}

impl PriorityGreedy {
    /// Cheapest tier first: SLOW, MEDIUM, FAST
    #[must_use]
    pub const fn cost_first(replication_factor: usize) -> Self {
        Self {
            name: "cost-greedy",
            order: [Tier::Slow, Tier::Medium, Tier::Fast],
            replication_factor,
        }
    }

    /// Fastest tier first: FAST, MEDIUM, SLOW
    #[must_use]
    pub const fn latency_first(replication_factor: usize) -> Self {
        Self {
            name: "time-greedy",
            order: Tier::ALL,
            replication_factor,
        }
    }
}

impl PlacementStrategy for PriorityGreedy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier> {
        let required = required_capacity(size_kb, self.replication_factor);
        let tier = first_feasible(topology, self.order, required)?;
        debug!(strategy = self.name, %tier, required, "tier selected");
        Ok(tier)
    }
}

/// Prefers the tier with the most free space
#[derive(Clone, Debug)]
pub struct SpaceGreedy {
    replication_factor: usize,
}

impl SpaceGreedy {
    #[must_use]
    pub const fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }
}

impl PlacementStrategy for SpaceGreedy {
    fn name(&self) -> &'static str {
        "space-greedy"
    }

    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier> {
        let required = required_capacity(size_kb, self.replication_factor);
        let mut order = Tier::ALL;
        order.sort_by(|a, b| {
            topology
                .available_capacity(*b)
                .cmp(&topology.available_capacity(*a))
        });
        let tier = first_feasible(topology, order, required)?;
        debug!(strategy = self.name(), %tier, required, "tier selected");
        Ok(tier)
    }
}

/// Prefers the least used tier
#[derive(Clone, Debug)]
pub struct LoadBalancingGreedy {
    replication_factor: usize,
}

impl LoadBalancingGreedy {
    #[must_use]
    pub const fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }
}

impl PlacementStrategy for LoadBalancingGreedy {
    fn name(&self) -> &'static str {
        "load-balancing-greedy"
    }

    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier> {
        let required = required_capacity(size_kb, self.replication_factor);
        let mut order = Tier::ALL;
        order.sort_by_key(|tier| topology.get(*tier).used_capacity);
        let tier = first_feasible(topology, order, required)?;
        debug!(strategy = self.name(), %tier, required, "tier selected");
        Ok(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TierInfo;
    use tiersim_common::Error;

    fn tier(tier: Tier, used: u64, available: u64) -> TierInfo {
        TierInfo {
            node_count: 1,
            total_capacity: used + available,
            used_capacity: used,
            available_capacity: available,
            ..TierInfo::empty(tier)
        }
    }

    fn uniform(available: u64) -> TierTopology {
        TierTopology::new()
            .with_tier(tier(Tier::Fast, 0, available))
            .with_tier(tier(Tier::Medium, 0, available))
            .with_tier(tier(Tier::Slow, 0, available))
    }

    #[test]
    fn test_latency_first_walks_fast_to_slow() {
        let mut strategy = PriorityGreedy::latency_first(1);
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 50, 50))
            .with_tier(tier(Tier::Medium, 0, 100))
            .with_tier(tier(Tier::Slow, 0, 100));

        assert_eq!(strategy.select(&topology, 50).unwrap(), Tier::Fast);
        assert_eq!(strategy.select(&topology, 60).unwrap(), Tier::Medium);
    }

    #[test]
    fn test_cost_first_prefers_slow() {
        let mut strategy = PriorityGreedy::cost_first(3);
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 0, 300))
            .with_tier(tier(Tier::Medium, 0, 300))
            .with_tier(tier(Tier::Slow, 0, 20));

        // 10 KB x 3 replicas does not fit in SLOW
        assert_eq!(strategy.select(&topology, 10).unwrap(), Tier::Medium);
        assert_eq!(strategy.select(&topology, 5).unwrap(), Tier::Slow);
    }

    #[test]
    fn test_priority_greedy_no_storage() {
        let mut strategy = PriorityGreedy::latency_first(1);
        let err = strategy.select(&uniform(100), 200).unwrap_err();
        assert!(matches!(
            err,
            Error::NoStorageAvailable { required: 200, ref available } if available.len() == 3
        ));
    }

    #[test]
    fn test_space_greedy_prefers_most_free() {
        let mut strategy = SpaceGreedy::new(1);
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 0, 10))
            .with_tier(tier(Tier::Medium, 0, 30))
            .with_tier(tier(Tier::Slow, 0, 20));

        assert_eq!(strategy.select(&topology, 5).unwrap(), Tier::Medium);
    }

    #[test]
    fn test_space_greedy_ties_keep_tier_order() {
        let mut strategy = SpaceGreedy::new(1);
        assert_eq!(strategy.select(&uniform(100), 5).unwrap(), Tier::Fast);
    }

    #[test]
    fn test_load_balancing_prefers_least_used() {
        let mut strategy = LoadBalancingGreedy::new(2);
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 50, 50))
            .with_tier(tier(Tier::Medium, 10, 15))
            .with_tier(tier(Tier::Slow, 30, 70));

        // MEDIUM is least used but 10 KB x 2 does not fit
        assert_eq!(strategy.select(&topology, 10).unwrap(), Tier::Slow);
        assert_eq!(strategy.select(&topology, 5).unwrap(), Tier::Medium);
    }

    #[test]
    fn test_returned_tier_is_feasible() {
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 90, 10))
            .with_tier(tier(Tier::Medium, 0, 60))
            .with_tier(tier(Tier::Slow, 70, 30));
        let mut strategies: Vec<Box<dyn PlacementStrategy>> = vec![
            Box::new(PriorityGreedy::cost_first(3)),
            Box::new(PriorityGreedy::latency_first(3)),
            Box::new(SpaceGreedy::new(3)),
            Box::new(LoadBalancingGreedy::new(3)),
        ];
        for strategy in &mut strategies {
            for size in [1, 5, 10, 20, 21] {
                match strategy.select(&topology, size) {
                    Ok(tier) => assert!(topology.get(tier).has_capacity(size * 3)),
                    Err(err) => {
                        assert!(size * 3 > 60, "{} failed for {size}: {err}", strategy.name());
                    }
                }
            }
        }
    }
}
