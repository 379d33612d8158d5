//! Read-only run metrics
//!
//! Every value is derived on demand from the data manager, its nodes and
//! their media. Nothing here mutates the engine.

use crate::data_manager::DataManager;
use crate::node::{NodeStats, StorageNode};
use serde::Serialize;
use tiersim_common::{ObjectId, Tier};
use tracing::debug;

/// Estimated requests per unit of temperature
const ESR_REQUESTS_PER_TEMPERATURE: f64 = 10.0;
/// KB per unit of estimated response
const ESR_SIZE_DIVISOR: f64 = 10_000.0;

/// One resident object in a tier snapshot
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectReport {
    pub id: ObjectId,
    pub size_kb: u64,
    /// Size times the number of replicas held
    pub replica_kb: u64,
    pub accesses: u64,
    pub temperature: f64,
}

/// Capacity and resident objects of one tier
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierReport {
    pub tier: Tier,
    pub available_capacity: u64,
    pub used_capacity: u64,
    pub total_capacity: u64,
    /// Sum of resident object sizes, one replica each
    pub total_data_size: u64,
    pub objects: Vec<ObjectReport>,
}

/// Counters and capacity of one node
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeReport {
    pub name: String,
    pub tier: Tier,
    pub used_capacity: u64,
    pub total_capacity: u64,
    pub stats: NodeStats,
    /// Unavailable responses summed over the node's media
    pub medium_unavailable: u64,
}

/// Summary row written once per simulated run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub strategy: String,
    pub total_cost: f64,
    pub read_response_time_ms: f64,
    pub write_response_time_ms: f64,
    pub delete_response_time_ms: f64,
    pub total_response_time_ms: f64,
    pub read_requests: u64,
    pub write_requests: u64,
    pub delete_requests: u64,
    pub successful_writes: u64,
    pub unsuccessful_writes: u64,
    pub successful_reads: u64,
    pub unsuccessful_reads: u64,
    pub node_unavailability: u64,
    pub medium_unavailability: u64,
    pub total_files: usize,
    pub total_replicas: usize,
    pub available_capacity: u64,
    pub total_capacity: u64,
    pub estimated_system_response: f64,
    pub optimization: f64,
}

/// Aggregates over a borrowed engine
#[derive(Clone, Copy, Debug)]
pub struct MetricsCalculator<'a> {
    data: &'a DataManager,
}

impl<'a> MetricsCalculator<'a> {
    #[must_use]
    pub const fn new(data: &'a DataManager) -> Self {
        Self { data }
    }

    fn nodes(&self) -> impl Iterator<Item = &'a StorageNode> + 'a {
        self.data.node_manager().all_nodes()
    }

    fn sum_f64(&self, f: impl Fn(&NodeStats) -> f64) -> f64 {
        self.nodes().map(|n| f(n.stats())).sum()
    }

    fn sum_u64(&self, f: impl Fn(&NodeStats) -> u64) -> u64 {
        self.nodes().map(|n| f(n.stats())).sum()
    }

    /// Accrued operation cost over every node
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.nodes().map(StorageNode::total_cost).sum()
    }

    /// Accrued operation cost of one tier
    #[must_use]
    pub fn tier_cost(&self, tier: Tier) -> f64 {
        self.data
            .node_manager()
            .nodes(tier)
            .map(StorageNode::total_cost)
            .sum()
    }

    #[must_use]
    pub fn total_read_response_time(&self) -> f64 {
        self.sum_f64(|s| s.read_time_ms)
    }

    #[must_use]
    pub fn total_write_response_time(&self) -> f64 {
        self.sum_f64(|s| s.write_time_ms)
    }

    #[must_use]
    pub fn total_delete_response_time(&self) -> f64 {
        self.sum_f64(|s| s.delete_time_ms)
    }

    #[must_use]
    pub fn total_response_time(&self) -> f64 {
        self.total_read_response_time()
            + self.total_write_response_time()
            + self.total_delete_response_time()
    }

    /// Node-level reads served
    #[must_use]
    pub fn total_read_requests(&self) -> u64 {
        self.sum_u64(|s| s.reads)
    }

    #[must_use]
    pub fn total_write_requests(&self) -> u64 {
        self.sum_u64(|s| s.writes)
    }

    #[must_use]
    pub fn total_delete_requests(&self) -> u64 {
        self.sum_u64(|s| s.deletes)
    }

    #[must_use]
    pub fn successful_writes(&self) -> u64 {
        self.data.stats().successful_writes
    }

    #[must_use]
    pub fn unsuccessful_writes(&self) -> u64 {
        self.data.stats().unsuccessful_writes
    }

    #[must_use]
    pub fn successful_reads(&self) -> u64 {
        self.data.stats().successful_reads
    }

    #[must_use]
    pub fn unsuccessful_reads(&self) -> u64 {
        self.data.stats().unsuccessful_reads
    }

    /// Requests refused by unavailable nodes
    #[must_use]
    pub fn total_unavailability(&self) -> u64 {
        self.sum_u64(|s| s.unavailable)
    }

    /// Requests refused by unavailable media
    #[must_use]
    pub fn medium_unavailability(&self) -> u64 {
        self.nodes()
            .flat_map(StorageNode::media)
            .map(|m| m.stats().unavailable)
            .sum()
    }

    #[must_use]
    pub fn total_replicas(&self) -> usize {
        self.data.get_num_replicas()
    }

    /// Catalog size, soft-deleted objects included
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.data.get_num_files()
    }

    #[must_use]
    pub fn total_capacity(&self) -> u64 {
        self.data.capacity().system_total_capacity()
    }

    #[must_use]
    pub fn total_available_capacity(&self) -> u64 {
        self.data.capacity().system_available_capacity()
    }

    /// Estimated System Response, lower is better
    ///
    /// Per tier, each resident object contributes
    /// `10 * temperature * size / 10000`; tier sums are weighted by
    /// [`Tier::esr_weight`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimated_system_response(&self) -> f64 {
        let mut total = 0.0;
        for (tier, objects) in self.data.all_tier_objects() {
            let tier_sum: f64 = objects
                .iter()
                .map(|obj| {
                    ESR_REQUESTS_PER_TEMPERATURE * obj.temperature()
                        * (obj.size() as f64 / ESR_SIZE_DIVISOR)
                })
                .sum();
            let weighted = tier.esr_weight() * tier_sum;
            debug!(
                %tier,
                weight = tier.esr_weight(),
                files = objects.len(),
                tier_sum,
                weighted,
                "esr tier contribution"
            );
            total += weighted;
        }
        total
    }

    /// Unit-weighted objective, lower is better
    ///
    /// `cost + response time + unavailability - successful writes +
    /// unsuccessful writes`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn optimization_function(&self) -> f64 {
        self.total_cost() + self.total_response_time() + self.total_unavailability() as f64
            - self.successful_writes() as f64
            + self.unsuccessful_writes() as f64
    }

    /// Capacity and resident objects of every tier, fastest first
    #[must_use]
    pub fn tier_reports(&self) -> Vec<TierReport> {
        self.data
            .node_manager()
            .tier_capacity_info()
            .into_iter()
            .zip(self.data.all_tier_objects())
            .map(|((tier, capacity), (_, objects))| {
                let objects: Vec<ObjectReport> = objects
                    .into_iter()
                    .map(|obj| {
                        let replicas = self.data.get_file_num_replicas(obj.id()).unwrap_or(0);
                        ObjectReport {
                            id: obj.id().clone(),
                            size_kb: obj.size(),
                            replica_kb: obj.size().saturating_mul(replicas as u64),
                            accesses: obj.total_accesses(),
                            temperature: obj.temperature(),
                        }
                    })
                    .collect();
                TierReport {
                    tier,
                    available_capacity: capacity.available_capacity,
                    used_capacity: capacity.used_capacity,
                    total_capacity: capacity.total_capacity,
                    total_data_size: objects.iter().map(|o| o.size_kb).sum(),
                    objects,
                }
            })
            .collect()
    }

    /// Per-node counters, fastest tier first
    #[must_use]
    pub fn node_reports(&self) -> Vec<NodeReport> {
        self.nodes()
            .map(|n| NodeReport {
                name: n.name().to_string(),
                tier: n.tier(),
                used_capacity: n.used_capacity(),
                total_capacity: n.total_capacity(),
                stats: n.stats().clone(),
                medium_unavailable: n.media().iter().map(|m| m.stats().unavailable).sum(),
            })
            .collect()
    }

    /// Everything a run reports, labelled with the strategy that drove it
    #[must_use]
    pub fn summary(&self, strategy: &str) -> RunSummary {
        RunSummary {
            strategy: strategy.to_string(),
            total_cost: self.total_cost(),
            read_response_time_ms: self.total_read_response_time(),
            write_response_time_ms: self.total_write_response_time(),
            delete_response_time_ms: self.total_delete_response_time(),
            total_response_time_ms: self.total_response_time(),
            read_requests: self.total_read_requests(),
            write_requests: self.total_write_requests(),
            delete_requests: self.total_delete_requests(),
            successful_writes: self.successful_writes(),
            unsuccessful_writes: self.unsuccessful_writes(),
            successful_reads: self.successful_reads(),
            unsuccessful_reads: self.unsuccessful_reads(),
            node_unavailability: self.total_unavailability(),
            medium_unavailability: self.medium_unavailability(),
            total_files: self.total_files(),
            total_replicas: self.total_replicas(),
            available_capacity: self.total_available_capacity(),
            total_capacity: self.total_capacity(),
            estimated_system_response: self.estimated_system_response(),
            optimization: self.optimization_function(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventSink, TracingSink};
    use crate::node_manager::NodeManager;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use tiersim_common::Config;

    fn reliable(nodes_per_tier: usize, capacity_kb: u64, rf: usize) -> DataManager {
        let mut config = Config::default();
        config.cluster.fast_nodes = nodes_per_tier;
        config.cluster.medium_nodes = nodes_per_tier;
        config.cluster.slow_nodes = nodes_per_tier;
        config.cluster.replication_factor = rf;
        for tier in Tier::ALL {
            let node = config.tier_mut(tier);
            node.availability = 1.0;
            node.failure_rate = 0.0;
            let medium = config.medium_mut(tier.medium_kind());
            medium.capacity_kb = capacity_kb;
            medium.availability = 1.0;
            medium.error_rate = 0.0;
        }
        let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
        DataManager::new(
            NodeManager::from_config(&config, &sink),
            rf,
            config.retry.clone(),
            Box::new(StdRng::seed_from_u64(3)),
            sink,
        )
    }

    #[test]
    fn test_empty_engine() {
        let dm = reliable(1, 100, 1);
        let metrics = MetricsCalculator::new(&dm);

        assert!(metrics.total_cost().abs() < f64::EPSILON);
        assert!(metrics.total_response_time().abs() < f64::EPSILON);
        assert!(metrics.estimated_system_response().abs() < f64::EPSILON);
        assert!(metrics.optimization_function().abs() < f64::EPSILON);
        assert_eq!(metrics.total_capacity(), 300);
        assert_eq!(metrics.total_available_capacity(), 300);
        assert_eq!(metrics.tier_reports().len(), 3);
        assert_eq!(metrics.node_reports().len(), 3);
    }

    #[test]
    fn test_totals_follow_node_counters() {
        let mut dm = reliable(2, 1000, 2);
        let a = ObjectId::from("a");
        dm.write(Tier::Fast, &a, 10, 0).unwrap();
        dm.read(&a, 1).unwrap();
        dm.write(Tier::Slow, &ObjectId::from("b"), 20, 2).unwrap();
        dm.delete(&a, 3).unwrap();

        let metrics = MetricsCalculator::new(&dm);
        assert_eq!(metrics.total_write_requests(), 4);
        assert_eq!(metrics.total_read_requests(), 1);
        assert_eq!(metrics.total_delete_requests(), 2);
        assert_eq!(metrics.successful_writes(), 2);
        assert_eq!(metrics.successful_reads(), 1);
        assert_eq!(metrics.total_files(), 2);
        assert_eq!(metrics.total_replicas(), 2);
        assert_eq!(metrics.total_unavailability(), 0);

        let per_op = metrics.total_read_response_time()
            + metrics.total_write_response_time()
            + metrics.total_delete_response_time();
        assert!((metrics.total_response_time() - per_op).abs() < 1e-9);

        let by_tier: f64 = Tier::ALL.iter().map(|t| metrics.tier_cost(*t)).sum();
        assert!((metrics.total_cost() - by_tier).abs() < 1e-12);

        let expected = metrics.total_cost() + metrics.total_response_time() - 2.0;
        assert!((metrics.optimization_function() - expected).abs() < 1e-6);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_esr_weights_tiers() {
        let mut dm = reliable(1, 10_000, 1);
        dm.write(Tier::Fast, &ObjectId::from("hot"), 1000, 0).unwrap();
        dm.write(Tier::Slow, &ObjectId::from("cold"), 1000, 0).unwrap();

        let t_hot = dm.object(&ObjectId::from("hot")).unwrap().temperature();
        let t_cold = dm.object(&ObjectId::from("cold")).unwrap().temperature();
        let expected = 10.0 * (10.0 * t_hot * 0.1) + 1.0 * (10.0 * t_cold * 0.1);

        let esr = MetricsCalculator::new(&dm).estimated_system_response();
        assert!((esr - expected).abs() < 1e-9);
    }

    #[test]
    fn test_deleted_objects_leave_esr_and_reports() {
        let mut dm = reliable(1, 1000, 1);
        let a = ObjectId::from("a");
        dm.write(Tier::Medium, &a, 100, 0).unwrap();
        assert!(MetricsCalculator::new(&dm).estimated_system_response() > 0.0);

        dm.delete(&a, 1).unwrap();
        let metrics = MetricsCalculator::new(&dm);
        assert!(metrics.estimated_system_response().abs() < f64::EPSILON);
        assert!(metrics.tier_reports().iter().all(|r| r.objects.is_empty()));
        assert_eq!(metrics.total_files(), 1);
    }

    #[test]
    fn test_tier_report_contents() {
        let mut dm = reliable(3, 1000, 3);
        dm.write(Tier::Medium, &ObjectId::from("a"), 40, 0).unwrap();
        dm.write(Tier::Medium, &ObjectId::from("b"), 10, 1).unwrap();

        let reports = MetricsCalculator::new(&dm).tier_reports();
        let medium = &reports[1];
        assert_eq!(medium.tier, Tier::Medium);
        assert_eq!(medium.used_capacity, 150);
        assert_eq!(medium.available_capacity, 2850);
        assert_eq!(medium.total_data_size, 50);

        let ids: Vec<_> = medium.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(medium.objects[0].replica_kb, 120);
        assert_eq!(medium.objects[0].accesses, 1);
        assert!(reports[0].objects.is_empty());
    }

    #[test]
    fn test_summary_serializes() {
        let mut dm = reliable(1, 100, 1);
        dm.write(Tier::Fast, &ObjectId::from("a"), 10, 0).unwrap();
        dm.increment_unsuccessful_write();

        let summary = MetricsCalculator::new(&dm).summary("time-greedy");
        assert_eq!(summary.strategy, "time-greedy");
        assert_eq!(summary.successful_writes, 1);
        assert_eq!(summary.unsuccessful_writes, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["strategy"], "time-greedy");
        assert_eq!(json["total_files"], 1);
    }
}
