//! tiersim Placement - tier selection for new writes
//!
//! This crate implements the strategies that decide which storage tier
//! receives a fresh write. Every strategy works against a [`TierTopology`]
//! snapshot taken from the engine at call time and either returns a tier
//! with room for all replicas or fails with `NoStorageAvailable`.
//!
//! # Strategies
//!
//! - **cost-greedy / time-greedy**: fixed tier priority
//! - **space-greedy**: most free space first
//! - **load-balancing-greedy**: least used first
//! - **hybrid-greedy**: weighted score of cost, process time, space and availability
//! - **random**: uniform among feasible tiers
//!
//! # Example
//! ```ignore
//! use tiersim_placement::{StrategyKind, build_strategy};
//!
//! let mut strategy = build_strategy(StrategyKind::TimeGreedy, 3, None);
//! let tier = strategy.select(&system.topology(), object_size)?;
//! ```

pub mod greedy;
pub mod hybrid;
pub mod policy;
pub mod random;
pub mod topology;

pub use greedy::{LoadBalancingGreedy, PriorityGreedy, SpaceGreedy};
pub use hybrid::HybridGreedy;
pub use policy::{PlacementStrategy, StrategyKind, build_strategy, required_capacity};
pub use random::RandomPlacement;
pub use topology::{TierInfo, TierTopology};
