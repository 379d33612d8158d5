//! Tier topology snapshot handed to placement strategies

use serde::{Deserialize, Serialize};
use tiersim_common::{Error, Tier};

/// Capacity, cost and timing view of one tier at a point in time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier: Tier,
    /// Number of member nodes
    pub node_count: usize,
    /// Sum of member capacities (KB)
    pub total_capacity: u64,
    /// Sum of member used capacities (KB)
    pub used_capacity: u64,
    /// Sum of member free space (KB)
    pub available_capacity: u64,
    /// Flat per-read cost of the tier's nodes
    pub cost: f64,
    /// Node process time (ms)
    pub process_time: f64,
    /// Availability of the emptiest node
    pub availability: f64,
}

impl TierInfo {
    /// Create an empty tier entry
    #[must_use]
    pub const fn empty(tier: Tier) -> Self {
        Self {
            tier,
            node_count: 0,
            total_capacity: 0,
            used_capacity: 0,
            available_capacity: 0,
            cost: 0.0,
            process_time: 0.0,
            availability: 0.0,
        }
    }

    /// Check if the tier can hold `required` KB
    #[must_use]
    pub const fn has_capacity(&self, required: u64) -> bool {
        self.available_capacity >= required
    }
}

/// Snapshot of every tier, fastest first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierTopology {
    tiers: [TierInfo; 3],
}

impl Default for TierTopology {
    fn default() -> Self {
        Self {
            tiers: Tier::ALL.map(TierInfo::empty),
        }
    }
}

impl TierTopology {
    /// Create an empty topology
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `info.tier`
    pub fn upsert(&mut self, info: TierInfo) {
        let idx = Self::index(info.tier);
        self.tiers[idx] = info;
    }

    /// Builder form of [`Self::upsert`]
    #[must_use]
    pub fn with_tier(mut self, info: TierInfo) -> Self {
        self.upsert(info);
        self
    }

    /// Entry for a tier
    #[must_use]
    pub const fn get(&self, tier: Tier) -> &TierInfo {
        &self.tiers[Self::index(tier)]
    }

    /// All entries, fastest first
    pub fn iter(&self) -> impl Iterator<Item = &TierInfo> {
        self.tiers.iter()
    }

    /// Free space of a tier
    #[must_use]
    pub const fn available_capacity(&self, tier: Tier) -> u64 {
        self.get(tier).available_capacity
    }

    /// Build the error reported when no tier can host `required` KB
    #[must_use]
    pub fn no_storage_error(&self, required: u64) -> Error {
        Error::NoStorageAvailable {
            required,
            available: self
                .tiers
                .iter()
                .map(|info| (info.tier, info.available_capacity))
                .collect(),
        }
    }

    const fn index(tier: Tier) -> usize {
        match tier {
            Tier::Fast => 0,
            Tier::Medium => 1,
            Tier::Slow => 2,
        }
    }
}
