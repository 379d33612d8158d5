//! Uniform random tier selection

use crate::policy::{PlacementStrategy, required_capacity};
use crate::topology::TierTopology;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tiersim_common::{Result, Tier};
use tracing::debug;

/// Picks uniformly among the tiers that can hold the object
#[derive(Debug)]
pub struct RandomPlacement {
    replication_factor: usize,
    rng: StdRng,
}

impl RandomPlacement {
    /// Create a strategy seeded from entropy
    #[must_use]
    pub fn new(replication_factor: usize) -> Self {
        Self {
            replication_factor,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible strategy
    #[must_use]
    pub fn with_seed(replication_factor: usize, seed: u64) -> Self {
        Self {
            replication_factor,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PlacementStrategy for RandomPlacement {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier> {
        let required = required_capacity(size_kb, self.replication_factor);
        let feasible: Vec<Tier> = Tier::ALL
            .into_iter()
            .filter(|tier| topology.get(*tier).has_capacity(required))
            .collect();

        let tier = *feasible
            .choose(&mut self.rng)
            .ok_or_else(|| topology.no_storage_error(required))?;
        debug!(strategy = self.name(), %tier, required, candidates = feasible.len(), "tier selected");
        Ok(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TierInfo;
    use std::collections::HashSet;

    fn tier(tier: Tier, available: u64) -> TierInfo {
        TierInfo {
            node_count: 1,
            total_capacity: available,
            available_capacity: available,
            ..TierInfo::empty(tier)
        }
    }

    #[test]
    fn test_random_only_picks_feasible_tiers() {
        let mut strategy = RandomPlacement::with_seed(1, 42);
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 5))
            .with_tier(tier(Tier::Medium, 100))
            .with_tier(tier(Tier::Slow, 100));

        let picked: HashSet<Tier> = (0..200)
            .map(|_| strategy.select(&topology, 10).unwrap())
            .collect();
        assert!(!picked.contains(&Tier::Fast));
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_random_is_reproducible() {
        let topology = TierTopology::new()
            .with_tier(tier(Tier::Fast, 100))
            .with_tier(tier(Tier::Medium, 100))
            .with_tier(tier(Tier::Slow, 100));
        let mut a = RandomPlacement::with_seed(1, 7);
        let mut b = RandomPlacement::with_seed(1, 7);
        for _ in 0..20 {
            assert_eq!(
                a.select(&topology, 1).unwrap(),
                b.select(&topology, 1).unwrap()
            );
        }
    }

    #[test]
    fn test_random_no_storage() {
        let mut strategy = RandomPlacement::with_seed(3, 1);
        let topology = TierTopology::new().with_tier(tier(Tier::Slow, 10));
        assert!(strategy.select(&topology, 10).unwrap_err().is_capacity());
    }
}
