//! Storage system facade
//!
//! Builds the node registry and data manager from a validated [`Config`]
//! and owns the single random stream every sampling call draws from.

use crate::capacity::CapacityManager;
use crate::data_manager::DataManager;
use crate::events::{EventSink, TracingSink};
use crate::metrics::MetricsCalculator;
use crate::node_manager::NodeManager;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use tiersim_common::{Config, ObjectId, Result, Tier};
use tiersim_placement::{PlacementStrategy, TierTopology};
use tracing::{info, warn};

/// A configured tiered cluster
#[derive(Debug)]
pub struct StorageSystem {
    config: Config,
    data: DataManager,
}

impl StorageSystem {
    /// Build a cluster with an explicit random stream and event sink
    pub fn new(
        config: Config,
        rng: Box<dyn RngCore + Send>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let nodes = NodeManager::from_config(&config, &sink);
        let data = DataManager::new(
            nodes,
            config.cluster.replication_factor,
            config.retry.clone(),
            rng,
            sink,
        );
        info!(
            replication_factor = config.cluster.replication_factor,
            capacity_kb = data.capacity().system_total_capacity(),
            max_attempts = ?config.retry.max_attempts,
            "storage system ready"
        );
        Ok(Self { config, data })
    }

    /// Build a cluster seeded from `cluster.seed`, or from entropy when unset
    pub fn from_config(config: Config) -> Result<Self> {
        let rng: Box<dyn RngCore + Send> = match config.cluster.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        Self::new(config, rng, Arc::new(TracingSink))
    }

    /// Build a cluster drawing from `rng`
    pub fn with_rng(config: Config, rng: Box<dyn RngCore + Send>) -> Result<Self> {
        Self::new(config, rng, Arc::new(TracingSink))
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn replication_factor(&self) -> usize {
        self.data.replication_factor()
    }

    #[must_use]
    pub const fn data_manager(&self) -> &DataManager {
        &self.data
    }

    pub const fn data_manager_mut(&mut self) -> &mut DataManager {
        &mut self.data
    }

    #[must_use]
    pub const fn node_manager(&self) -> &NodeManager {
        self.data.node_manager()
    }

    #[must_use]
    pub const fn capacity(&self) -> CapacityManager<'_> {
        self.data.capacity()
    }

    #[must_use]
    pub const fn metrics(&self) -> MetricsCalculator<'_> {
        MetricsCalculator::new(&self.data)
    }

    /// Snapshot handed to placement strategies
    #[must_use]
    pub fn topology(&self) -> TierTopology {
        self.data.node_manager().topology()
    }

    #[must_use]
    pub fn has_data(&self, id: &ObjectId) -> bool {
        self.data.has_data(id)
    }

    pub fn write(&mut self, tier: Tier, id: &ObjectId, size_kb: u64, timestamp: u64) -> Result<f64> {
        self.data.write(tier, id, size_kb, timestamp)
    }

    pub fn read(&mut self, id: &ObjectId, timestamp: u64) -> Result<f64> {
        self.data.read(id, timestamp)
    }

    pub fn delete(&mut self, id: &ObjectId, timestamp: u64) -> Result<f64> {
        self.data.delete(id, timestamp)
    }

    /// Let `strategy` pick a tier and write the object there
    ///
    /// A strategy that finds no tier counts as an unsuccessful write.
    pub fn place(
        &mut self,
        strategy: &mut dyn PlacementStrategy,
        id: &ObjectId,
        size_kb: u64,
        timestamp: u64,
    ) -> Result<(Tier, f64)> {
        let tier = match strategy.select(&self.topology(), size_kb) {
            Ok(tier) => tier,
            Err(err) => {
                warn!(strategy = strategy.name(), %id, size_kb, %err, "no tier selected");
                self.data.increment_unsuccessful_write();
                return Err(err);
            }
        };
        let elapsed = self.write(tier, id, size_kb, timestamp)?;
        Ok((tier, elapsed))
    }

    /// Drop every object and counter, keeping the node layout
    pub fn reset(&mut self) {
        self.data.reset();
    }
}
