//! Weighted multi-criteria tier selection

use crate::policy::{PlacementStrategy, first_feasible, required_capacity};
use crate::topology::{TierInfo, TierTopology};
use tiersim_common::{Result, Tier};
use tracing::debug;

const COST_WEIGHT: f64 = 0.3;
const PROCESS_TIME_WEIGHT: f64 = 0.3;
const SPACE_WEIGHT: f64 = 0.2;
const AVAILABILITY_WEIGHT: f64 = 0.2;

/// Ranks tiers by a weighted score of cost, process time, space and availability
#[derive(Clone, Debug)]
pub struct HybridGreedy {
    replication_factor: usize,
}

impl HybridGreedy {
    #[must_use]
    pub const fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }

    /// Score of a tier, higher is preferred
    ///
    /// A tier without a cost (no nodes) contributes nothing for the cost term.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(info: &TierInfo) -> f64 {
        let inverse_cost = if info.cost > 0.0 { 1.0 / info.cost } else { 0.0 };
        COST_WEIGHT * inverse_cost
            + PROCESS_TIME_WEIGHT * info.process_time
            + SPACE_WEIGHT * info.available_capacity as f64
            + AVAILABILITY_WEIGHT * info.availability
    }
}

impl PlacementStrategy for HybridGreedy {
    fn name(&self) -> &'static str {
        "hybrid-greedy"
    }

    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier> {
        let required = required_capacity(size_kb, self.replication_factor);
        let mut order = Tier::ALL;
        order.sort_by(|a, b| Self::score(topology.get(*b)).total_cmp(&Self::score(topology.get(*a))));
        let tier = first_feasible(topology, order, required)?;
        debug!(strategy = self.name(), %tier, required, "tier selected");
        Ok(tier)
    }
}
