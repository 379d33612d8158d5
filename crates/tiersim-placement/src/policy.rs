//! Placement strategy contract and registry

use crate::greedy::{LoadBalancingGreedy, PriorityGreedy, SpaceGreedy};
use crate::hybrid::HybridGreedy;
use crate::random::RandomPlacement;
use crate::topology::TierTopology;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiersim_common::{Error, Result, Tier};

/// A placement strategy chooses the tier that receives a new write
///
/// Implementations get their replication factor at construction and a fresh
/// [`TierTopology`] snapshot on every call. A returned tier always has at
/// least `size_kb * replication_factor` KB available; when no tier does,
/// the strategy fails with [`Error::NoStorageAvailable`].
pub trait PlacementStrategy: Send {
    /// Registered strategy name
    fn name(&self) -> &'static str;

    /// Select the tier for an object of `size_kb` KB
    fn select(&mut self, topology: &TierTopology, size_kb: u64) -> Result<Tier>;
}

/// Capacity needed to host every replica of an object
#[must_use]
pub const fn required_capacity(size_kb: u64, replication_factor: usize) -> u64 {
    size_kb.saturating_mul(replication_factor as u64)
}

/// Return the first tier in `order` that can hold `required` KB
pub(crate) fn first_feasible(
    topology: &TierTopology,
    order: impl IntoIterator<Item = Tier>,
    required: u64,
) -> Result<Tier> {
    order
        .into_iter()
        .find(|tier| topology.get(*tier).has_capacity(required))
        .ok_or_else(|| topology.no_storage_error(required))
}

/// Registered strategy names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    CostGreedy,
    TimeGreedy,
    SpaceGreedy,
    LoadBalancingGreedy,
    HybridGreedy,
    Random,
}

impl StrategyKind {
    /// Every registered strategy
    pub const ALL: [Self; 6] = [
        Self::CostGreedy,
        Self::TimeGreedy,
        Self::SpaceGreedy,
        Self::LoadBalancingGreedy,
        Self::HybridGreedy,
        Self::Random,
    ];

    /// Registered name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CostGreedy => "cost-greedy",
            Self::TimeGreedy => "time-greedy",
            Self::SpaceGreedy => "space-greedy",
            Self::LoadBalancingGreedy => "load-balancing-greedy",
            Self::HybridGreedy => "hybrid-greedy",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::invalid_argument(format!("unknown strategy: {s}")))
    }
}

/// Construct a strategy by kind
///
/// `seed` only affects [`StrategyKind::Random`]; `None` seeds from entropy.
#[must_use]
pub fn build_strategy(
    kind: StrategyKind,
    replication_factor: usize,
    seed: Option<u64>,
) -> Box<dyn PlacementStrategy> {
    match kind {
        StrategyKind::CostGreedy => Box::new(PriorityGreedy::cost_first(replication_factor)),
        StrategyKind::TimeGreedy => Box::new(PriorityGreedy::latency_first(replication_factor)),
        StrategyKind::SpaceGreedy => Box::new(SpaceGreedy::new(replication_factor)),
        StrategyKind::LoadBalancingGreedy => {
            Box::new(LoadBalancingGreedy::new(replication_factor))
        }
        StrategyKind::HybridGreedy => Box::new(HybridGreedy::new(replication_factor)),
        StrategyKind::Random => Box::new(match seed {
            Some(seed) => RandomPlacement::with_seed(replication_factor, seed),
            None => RandomPlacement::new(replication_factor),
        }),
    }
}
