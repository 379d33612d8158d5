//! Storage node: a tier member made of one or more media
//!
//! On top of the medium timing a node adds its own availability and failure
//! sampling, a process time, network latency and transfer time, and flat
//! per-operation cost accounting. At most one replica of an object lives on
//! a node, on exactly one of its media.

use crate::events::{EventSink, StorageEvent, TracingSink};
use crate::medium::{StorageMedium, pick_index, sample_bernoulli};
use crate::retry::RetryBudget;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use tiersim_common::config::{RetryConfig, TierNodeConfig};
use tiersim_common::{Error, NodeId, ObjectId, Operation, Result, Tier};

/// Default time charged for a caught medium fault (ms)
pub const DEFAULT_ERROR_RESPONSE_TIME_MS: f64 = 5.0;

/// Per-node operation counters
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodeStats {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    /// Requests refused because the node was unavailable
    pub unavailable: u64,
    /// Requests that hit a random node failure
    pub failures: u64,
    pub read_time_ms: f64,
    pub write_time_ms: f64,
    pub delete_time_ms: f64,
    /// Accrued flat operation cost
    pub total_cost: f64,
}

/// A simulated storage server
pub struct StorageNode {
    id: NodeId,
    name: String,
    tier: Tier,
    config: TierNodeConfig,
    media: Vec<StorageMedium>,
    error_response_time_ms: f64,
    retry: RetryConfig,
    stats: NodeStats,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StorageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("media", &self.media.len())
            .field("used_capacity", &self.used_capacity())
            .field("total_capacity", &self.total_capacity())
            .finish_non_exhaustive()
    }
}

impl StorageNode {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        tier: Tier,
        config: TierNodeConfig,
        media: Vec<StorageMedium>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            tier,
            config,
            media,
            error_response_time_ms: DEFAULT_ERROR_RESPONSE_TIME_MS,
            retry: RetryConfig::default(),
            stats: NodeStats::default(),
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub const fn with_error_response_time(mut self, ms: f64) -> Self {
        self.error_response_time_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub const fn config(&self) -> &TierNodeConfig {
        &self.config
    }

    #[must_use]
    pub fn media(&self) -> &[StorageMedium] {
        &self.media
    }

    #[must_use]
    pub const fn stats(&self) -> &NodeStats {
        &self.stats
    }

    #[must_use]
    pub const fn total_cost(&self) -> f64 {
        self.stats.total_cost
    }

    /// Override the node availability for fault injection
    ///
    /// Values are clamped to `[0, 1]`; NaN takes the node down.
    pub fn set_availability(&mut self, availability: f64) {
        self.config.availability = if availability.is_nan() {
            0.0
        } else {
            availability.clamp(0.0, 1.0)
        };
    }

    /// Time a caller charges for a caught fault on this node (ms)
    #[must_use]
    pub const fn error_response_time(&self) -> f64 {
        self.error_response_time_ms
    }

    #[must_use]
    pub fn used_capacity(&self) -> u64 {
        self.media.iter().map(StorageMedium::used_capacity).sum()
    }

    #[must_use]
    pub fn total_capacity(&self) -> u64 {
        self.media.iter().map(StorageMedium::capacity).sum()
    }

    #[must_use]
    pub fn available_space(&self) -> u64 {
        self.media.iter().map(StorageMedium::available_space).sum()
    }

    #[must_use]
    pub fn has_data(&self, id: &ObjectId) -> bool {
        self.media.iter().any(|m| m.has_data(id))
    }

    /// Size of the replica held by this node
    #[must_use]
    pub fn object_size(&self, id: &ObjectId) -> Option<u64> {
        self.media.iter().find_map(|m| m.object_size(id))
    }

    /// Write or overwrite the replica of an object, returning elapsed ms
    pub fn write(
        &mut self,
        id: &ObjectId,
        size_kb: u64,
        overwrite: bool,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        self.check_faults(rng)?;

        let holder = self.media.iter().position(|m| m.has_data(id));
        let old_size = match holder {
            Some(_) if !overwrite => {
                return Err(Error::AlreadyExists {
                    id: id.clone(),
                    location: self.name.clone(),
                });
            }
            Some(idx) => self.media[idx].object_size(id).unwrap_or(0),
            None => 0,
        };

        let available = self.available_space();
        if size_kb > old_size && size_kb - old_size > available {
            return Err(Error::InsufficientCapacity {
                location: self.name.clone(),
                required: size_kb - old_size,
                available,
            });
        }

        // Rewrite in place when the holding medium has room, otherwise move
        // the replica to a medium that fits it whole.
        let candidates: Vec<usize> = match holder {
            Some(idx) if self.media[idx].available_space() + old_size >= size_kb => vec![idx],
            _ => (0..self.media.len())
                .filter(|i| Some(*i) != holder && self.media[*i].available_space() >= size_kb)
                .collect(),
        };
        if candidates.is_empty() {
            return Err(Error::InsufficientCapacity {
                location: self.name.clone(),
                required: size_kb,
                available: self
                    .media
                    .iter()
                    .map(StorageMedium::available_space)
                    .max()
                    .unwrap_or(0),
            });
        }

        let mut budget = RetryBudget::new("medium write", &self.retry);
        let mut medium_time = 0.0;
        let chosen = loop {
            let idx = candidates[pick_index(rng, candidates.len())];
            let in_place = holder == Some(idx);
            match self.media[idx].write(id, size_kb, in_place, rng) {
                Ok(elapsed) => {
                    medium_time += elapsed;
                    break idx;
                }
                Err(err) if err.is_transient() => {
                    medium_time += self.error_response_time_ms;
                    self.report_fault(idx, Operation::Write, id, &err);
                    budget.record_failure()?;
                }
                Err(err) => return Err(err),
            }
        };

        if let Some(idx) = holder
            && idx != chosen
        {
            self.media[idx].evict(id);
        }

        #[allow(clippy::cast_precision_loss)]
        let transfer = size_kb as f64 / self.config.network_speed;
        let elapsed = self.config.process_time_ms
            + self.config.network_write_latency_ms
            + transfer
            + medium_time;

        self.stats.writes += 1;
        self.stats.write_time_ms += elapsed;
        self.stats.total_cost += self.config.write_cost;
        self.report_op(Operation::Write, id, elapsed);
        Ok(elapsed)
    }

    /// Read the replica of an object, returning elapsed ms
    pub fn read(&mut self, id: &ObjectId, rng: &mut dyn RngCore) -> Result<f64> {
        self.check_faults(rng)?;

        let holders = self.holders(id);
        if holders.is_empty() {
            return Err(Error::NotFound(id.clone()));
        }

        let mut budget = RetryBudget::new("medium read", &self.retry);
        let mut medium_time = 0.0;
        loop {
            let idx = holders[pick_index(rng, holders.len())];
            match self.media[idx].read(id, rng) {
                Ok(elapsed) => {
                    medium_time += elapsed;
                    break;
                }
                Err(err) if err.is_transient() => {
                    medium_time += self.error_response_time_ms;
                    self.report_fault(idx, Operation::Read, id, &err);
                    budget.record_failure()?;
                }
                Err(err) => return Err(err),
            }
        }

        let size_kb = self.object_size(id).unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let transfer = size_kb as f64 / self.config.network_speed;
        let elapsed = self.config.process_time_ms
            + self.config.network_read_latency_ms
            + transfer
            + medium_time;

        self.stats.reads += 1;
        self.stats.read_time_ms += elapsed;
        self.stats.total_cost += self.config.read_cost;
        self.report_op(Operation::Read, id, elapsed);
        Ok(elapsed)
    }

    /// Delete the replica of an object, returning elapsed ms
    pub fn delete(&mut self, id: &ObjectId, rng: &mut dyn RngCore) -> Result<f64> {
        self.check_faults(rng)?;

        let mut holders = self.holders(id);
        if holders.is_empty() {
            return Err(Error::NotFound(id.clone()));
        }

        let mut budget = RetryBudget::new("medium delete", &self.retry);
        let mut medium_time = 0.0;
        while !holders.is_empty() {
            let pick = pick_index(rng, holders.len());
            let idx = holders[pick];
            match self.media[idx].delete(id, rng) {
                Ok(elapsed) => {
                    medium_time += elapsed;
                    holders.remove(pick);
                }
                Err(err) if err.is_transient() => {
                    medium_time += self.error_response_time_ms;
                    self.report_fault(idx, Operation::Delete, id, &err);
                    budget.record_failure()?;
                }
                Err(err) => return Err(err),
            }
        }

        let elapsed =
            self.config.process_time_ms + self.config.network_delete_latency_ms + medium_time;

        self.stats.deletes += 1;
        self.stats.delete_time_ms += elapsed;
        self.stats.total_cost += self.config.delete_cost;
        self.report_op(Operation::Delete, id, elapsed);
        Ok(elapsed)
    }

    /// Put a replica back to `size_kb` without simulating a request
    pub(crate) fn restore_replica(&mut self, id: &ObjectId, size_kb: u64) -> bool {
        self.media.iter_mut().any(|m| m.restore(id, size_kb))
    }

    /// Clear all media and counters
    pub fn reset(&mut self) {
        self.stats = NodeStats::default();
        for medium in &mut self.media {
            medium.reset();
        }
    }

    fn holders(&self, id: &ObjectId) -> Vec<usize> {
        self.media
            .iter()
            .enumerate()
            .filter(|(_, m)| m.has_data(id))
            .map(|(i, _)| i)
            .collect()
    }

    fn check_faults(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if !sample_bernoulli(rng, self.config.availability) {
            self.stats.unavailable += 1;
            return Err(Error::NodeUnavailable(self.name.clone()));
        }
        if sample_bernoulli(rng, self.config.failure_rate) {
            self.stats.failures += 1;
            return Err(Error::NodeFailure(self.name.clone()));
        }
        Ok(())
    }

    fn report_fault(&self, medium: usize, operation: Operation, id: &ObjectId, err: &Error) {
        self.sink.record(StorageEvent::Fault {
            location: self.media[medium].name().to_string(),
            operation,
            id: id.clone(),
            error: err.to_string(),
        });
    }

    fn report_op(&self, operation: Operation, id: &ObjectId, elapsed_ms: f64) {
        self.sink.record(StorageEvent::NodeOp {
            node: self.name.clone(),
            operation,
            id: id.clone(),
            elapsed_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::medium::tests::reliable_config;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tiersim_common::MediumKind;
    use tiersim_common::config::MediumConfig;

    fn reliable_tier() -> TierNodeConfig {
        TierNodeConfig {
            availability: 1.0,
            failure_rate: 0.0,
            ..TierNodeConfig::fast()
        }
    }

    fn node_with(media: Vec<MediumConfig>) -> StorageNode {
        let media = media
            .into_iter()
            .enumerate()
            .map(|(j, config)| StorageMedium::new(format!("fast_medium_0_{j}"), MediumKind::Nvme, config))
            .collect();
        StorageNode::new("fast_node_0", Tier::Fast, reliable_tier(), media)
    }

    #[test]
    fn test_write_response_time_components() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut node = node_with(vec![reliable_config(100)]);
        let id = ObjectId::from("a");

        let elapsed = node.write(&id, 10, false, &mut rng).unwrap();
        let medium_time = node.media()[0].stats().write_time_ms;
        let expected = 500.0 + 0.1 + 10.0 / 1_220_703.0 + medium_time;
        assert!((elapsed - expected).abs() < 1e-9);
        assert_eq!(node.used_capacity(), 10);
        assert_eq!(node.stats().writes, 1);
        assert!((node.total_cost() - 0.000_000_5).abs() < 1e-15);
    }

    #[test]
    fn test_read_and_delete_accrue_cost() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut node = node_with(vec![reliable_config(100)]);
        let id = ObjectId::from("a");
        node.write(&id, 10, false, &mut rng).unwrap();

        let read = node.read(&id, &mut rng).unwrap();
        assert!(read > 500.0 + 0.05);
        let delete = node.delete(&id, &mut rng).unwrap();
        let medium_delete = node.media()[0].stats().delete_time_ms;
        assert!((delete - (500.0 + 0.02 + medium_delete)).abs() < 1e-9);

        let expected_cost = 0.000_000_5 + 0.000_000_4 + 0.000_000_3;
        assert!((node.total_cost() - expected_cost).abs() < 1e-15);
        assert_eq!(node.used_capacity(), 0);
        assert!(!node.has_data(&id));
    }

    #[test]
    fn test_write_rejects_duplicate_and_oversize() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut node = node_with(vec![reliable_config(50), reliable_config(50)]);
        let id = ObjectId::from("a");
        node.write(&id, 10, false, &mut rng).unwrap();

        assert!(matches!(
            node.write(&id, 10, false, &mut rng).unwrap_err(),
            Error::AlreadyExists { .. }
        ));
        assert!(node.write(&ObjectId::from("b"), 91, false, &mut rng).unwrap_err().is_capacity());
    }

    #[test]
    fn test_write_without_single_fitting_medium() {
        let mut rng = StdRng::seed_from_u64(4);
        // 60 KB free in total but no medium can hold 40 KB whole
        let mut node = node_with(vec![reliable_config(30), reliable_config(30)]);

        let err = node.write(&ObjectId::from("a"), 40, false, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientCapacity {
                required: 40,
                available: 30,
                ..
            }
        ));
        assert_eq!(node.used_capacity(), 0);
        assert_eq!(node.stats().writes, 0);
    }

    #[test]
    fn test_overwrite_relocates_when_holder_is_full() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut node = node_with(vec![reliable_config(20), reliable_config(100)]);
        let id = ObjectId::from("a");
        let filler = ObjectId::from("filler");

        // the filler only fits the large medium, leaving the small one for "a"
        node.write(&filler, 90, false, &mut rng).unwrap();
        node.write(&id, 20, false, &mut rng).unwrap();
        assert!(node.media()[0].has_data(&id));
        node.delete(&filler, &mut rng).unwrap();

        node.write(&id, 50, true, &mut rng).unwrap();
        assert!(!node.media()[0].has_data(&id));
        assert_eq!(node.media()[1].object_size(&id), Some(50));
        assert_eq!(node.used_capacity(), 50);
    }

    #[test]
    fn test_unavailable_node() {
        let mut rng = StdRng::seed_from_u64(6);
        let config = TierNodeConfig {
            availability: 0.0,
            ..reliable_tier()
        };
        let mut node = StorageNode::new(
            "slow_node_0",
            Tier::Slow,
            config,
            vec![StorageMedium::new("m", MediumKind::Hdd, reliable_config(10))],
        );

        let err = node.write(&ObjectId::from("a"), 1, false, &mut rng).unwrap_err();
        assert!(matches!(err, Error::NodeUnavailable(_)));
        assert!(err.is_node_fault());
        assert_eq!(node.stats().unavailable, 1);
        assert_eq!(node.used_capacity(), 0);
    }

    #[test]
    fn test_nan_availability_takes_node_down() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut node = node_with(vec![reliable_config(10)]);

        node.set_availability(f64::NAN);
        assert!(node.config().availability.abs() < f64::EPSILON);
        let err = node.write(&ObjectId::from("a"), 1, false, &mut rng).unwrap_err();
        assert!(matches!(err, Error::NodeUnavailable(_)));

        node.set_availability(7.0);
        assert!(node.write(&ObjectId::from("a"), 1, false, &mut rng).is_ok());
    }

    #[test]
    fn test_medium_faults_charge_error_time_until_retry_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let sink = Arc::new(MemorySink::new());
        let medium = MediumConfig {
            availability: 0.0,
            ..reliable_config(100)
        };
        let mut node = node_with(vec![medium])
            .with_retry(RetryConfig {
                max_attempts: Some(4),
            })
            .with_sink(sink.clone());

        let err = node.write(&ObjectId::from("a"), 1, false, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            Error::RetryLimitExceeded { attempts: 4, .. }
        ));
        assert_eq!(node.media()[0].stats().unavailable, 4);
        assert_eq!(
            sink.count(|e| matches!(e, StorageEvent::Fault { .. })),
            4
        );
    }

    #[test]
    fn test_read_missing() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut node = node_with(vec![reliable_config(10)]);
        assert!(node.read(&ObjectId::from("x"), &mut rng).unwrap_err().is_not_found());
        assert!(node.delete(&ObjectId::from("x"), &mut rng).unwrap_err().is_not_found());
    }
}
