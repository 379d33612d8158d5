//! Replica placement, overwrite, read and delete across a tier
//!
//! The data manager owns the node registry, the object catalog and the
//! authoritative object -> replica-node map. Node faults are retried here
//! with the node's error response time charged for every failed attempt.
//!
//! Retry loops:
//! - fresh writes pick random candidates, dropping a node only once it
//!   holds a replica or fails terminally
//! - overwrites, reads and deletes never shrink their node set on a
//!   transient fault and rely on every attempt having a chance to succeed,
//!   unless [`RetryConfig::max_attempts`] bounds them

use crate::capacity::CapacityManager;
use crate::events::{EventSink, StorageEvent};
use crate::medium::pick_index;
use crate::node::StorageNode;
use crate::node_manager::NodeManager;
use crate::object::DataObject;
use crate::retry::RetryBudget;
use rand::RngCore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tiersim_common::config::RetryConfig;
use tiersim_common::{Error, NodeId, ObjectId, Operation, Result, Tier};
use tracing::{debug, warn};

/// Run-level operation outcome counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DataStats {
    pub successful_writes: u64,
    pub unsuccessful_writes: u64,
    pub successful_reads: u64,
    pub unsuccessful_reads: u64,
}

/// Orchestrates replicas of every object over the node registry
pub struct DataManager {
    nodes: NodeManager,
    replication_factor: usize,
    retry: RetryConfig,
    rng: Box<dyn RngCore + Send>,
    objects: BTreeMap<ObjectId, DataObject>,
    replicas: HashMap<ObjectId, Vec<NodeId>>,
    stats: DataStats,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for DataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager")
            .field("nodes", &self.nodes.node_count())
            .field("replication_factor", &self.replication_factor)
            .field("objects", &self.objects.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DataManager {
    #[must_use]
    pub fn new(
        nodes: NodeManager,
        replication_factor: usize,
        retry: RetryConfig,
        rng: Box<dyn RngCore + Send>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            nodes,
            replication_factor,
            retry,
            rng,
            objects: BTreeMap::new(),
            replicas: HashMap::new(),
            stats: DataStats::default(),
            sink,
        }
    }

    #[must_use]
    pub const fn node_manager(&self) -> &NodeManager {
        &self.nodes
    }

    #[must_use]
    pub const fn capacity(&self) -> CapacityManager<'_> {
        CapacityManager::new(&self.nodes)
    }

    #[must_use]
    pub const fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    #[must_use]
    pub const fn stats(&self) -> &DataStats {
        &self.stats
    }

    /// Register an additional node
    pub fn add_node(&mut self, node: StorageNode) -> Result<NodeId> {
        self.nodes.add_node(node)
    }

    /// Unregister a node, forgetting the replicas it held
    pub fn remove_node(&mut self, id: NodeId) -> Result<StorageNode> {
        let node = self.nodes.remove_node(id)?;
        for holders in self.replicas.values_mut() {
            holders.retain(|n| *n != id);
        }
        Ok(node)
    }

    /// Live (written and not deleted) object
    #[must_use]
    pub fn has_data(&self, id: &ObjectId) -> bool {
        self.objects.get(id).is_some_and(DataObject::has_data)
    }

    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<&DataObject> {
        self.objects.get(id)
    }

    /// Nodes holding a replica of an object
    #[must_use]
    pub fn replica_nodes(&self, id: &ObjectId) -> Option<&[NodeId]> {
        self.replicas.get(id).map(Vec::as_slice)
    }

    /// Catalog size, soft-deleted objects included
    #[must_use]
    pub fn get_num_files(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn get_num_replicas(&self) -> usize {
        self.replicas.values().map(Vec::len).sum()
    }

    pub fn get_file_num_replicas(&self, id: &ObjectId) -> Result<usize> {
        self.replicas
            .get(id)
            .map(Vec::len)
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// Count a write the caller could not place
    pub const fn increment_unsuccessful_write(&mut self) {
        self.stats.unsuccessful_writes += 1;
    }

    /// Objects with at least one replica in `tier`
    #[must_use]
    pub fn tier_objects(&self, tier: Tier) -> Vec<&DataObject> {
        self.objects
            .values()
            .filter(|obj| {
                self.replicas.get(obj.id()).is_some_and(|holders| {
                    holders
                        .iter()
                        .any(|n| self.nodes.get_node(*n).is_some_and(|node| node.tier() == tier))
                })
            })
            .collect()
    }

    /// [`Self::tier_objects`] for every tier, fastest first
    #[must_use]
    pub fn all_tier_objects(&self) -> Vec<(Tier, Vec<&DataObject>)> {
        Tier::ALL
            .into_iter()
            .map(|tier| (tier, self.tier_objects(tier)))
            .collect()
    }

    /// Tier currently holding a live object's replicas
    #[must_use]
    pub fn object_tier(&self, id: &ObjectId) -> Option<Tier> {
        if !self.has_data(id) {
            return None;
        }
        self.replicas
            .get(id)?
            .iter()
            .find_map(|n| self.nodes.get_node(*n))
            .map(StorageNode::tier)
    }

    /// Write an object to `tier`, returning the elapsed time in ms
    ///
    /// A live object already in `tier` is overwritten in place; a live object
    /// in another tier is deleted there and written fresh to `tier`.
    pub fn write(
        &mut self,
        tier: Tier,
        id: &ObjectId,
        size_kb: u64,
        timestamp: u64,
    ) -> Result<f64> {
        match self.object_tier(id) {
            Some(current) if current == tier => self.overwrite(tier, id, size_kb, timestamp),
            Some(current) => {
                let deleted = match self.delete(id, timestamp) {
                    Ok(t) => t,
                    Err(err) => {
                        self.stats.unsuccessful_writes += 1;
                        return Err(err);
                    }
                };
                self.sink.record(StorageEvent::Migrated {
                    id: id.clone(),
                    from: current,
                    to: tier,
                });
                Ok(deleted + self.write_new(tier, id, size_kb, timestamp)?)
            }
            None => self.write_new(tier, id, size_kb, timestamp),
        }
    }

    fn write_new(&mut self, tier: Tier, id: &ObjectId, size_kb: u64, timestamp: u64) -> Result<f64> {
        let required = size_kb.saturating_mul(self.replication_factor as u64);
        if !self.capacity().has_sufficient_capacity(tier, required) {
            let available = self.capacity().available_capacity(tier);
            return Err(self.reject_write(
                id,
                Error::InsufficientCapacity {
                    location: tier.to_string(),
                    required,
                    available,
                },
            ));
        }

        let object = self
            .objects
            .entry(id.clone())
            .or_insert_with(|| DataObject::new(id.clone(), size_kb));
        object.set_size(size_kb);
        object.mark_written();
        object.record_write(timestamp, &mut *self.rng);

        let mut candidates: Vec<NodeId> = self
            .nodes
            .nodes(tier)
            .filter(|n| n.available_space() >= size_kb)
            .map(StorageNode::id)
            .collect();
        let mut placed = Vec::with_capacity(self.replication_factor);
        let mut budget = RetryBudget::new("replica write", &self.retry);
        let mut elapsed = 0.0;

        while !candidates.is_empty() && placed.len() < self.replication_factor {
            let pick = pick_index(&mut *self.rng, candidates.len());
            let node_id = candidates[pick];
            let node = self.nodes.node_mut(node_id)?;
            match node.write(id, size_kb, false, &mut *self.rng) {
                Ok(t) => {
                    elapsed += t;
                    placed.push(node_id);
                    candidates.remove(pick);
                }
                Err(err) if err.is_transient() => {
                    elapsed += node.error_response_time();
                    self.sink.record(StorageEvent::Fault {
                        location: node.name().to_string(),
                        operation: Operation::Write,
                        id: id.clone(),
                        error: err.to_string(),
                    });
                    if let Err(limit) = budget.record_failure() {
                        self.replicas.insert(id.clone(), placed);
                        return Err(self.reject_write(id, limit));
                    }
                }
                Err(err) => {
                    warn!(node = %node.name(), %id, %err, "dropping node from replica candidates");
                    candidates.remove(pick);
                }
            }
        }

        self.sink.record(StorageEvent::Placed {
            id: id.clone(),
            tier,
            replicas: placed.len(),
            target: self.replication_factor,
            elapsed_ms: elapsed,
        });
        self.replicas.insert(id.clone(), placed);
        self.stats.successful_writes += 1;
        Ok(elapsed)
    }

    fn overwrite(&mut self, tier: Tier, id: &ObjectId, size_kb: u64, timestamp: u64) -> Result<f64> {
        let old_size = self.objects.get(id).map_or(0, DataObject::size);
        let required = size_kb
            .saturating_sub(old_size)
            .saturating_mul(self.replication_factor as u64);
        if required > 0 && !self.capacity().has_sufficient_capacity(tier, required) {
            let available = self.capacity().available_capacity(tier);
            return Err(self.reject_write(
                id,
                Error::InsufficientCapacity {
                    location: tier.to_string(),
                    required,
                    available,
                },
            ));
        }

        let holders = self.replicas.get(id).cloned().unwrap_or_default();
        let growth = size_kb.saturating_sub(old_size);
        if growth > 0
            && let Some(node) = holders
                .iter()
                .filter_map(|n| self.nodes.get_node(*n))
                .find(|node| node.available_space() < growth)
        {
            let err = Error::InsufficientCapacity {
                location: node.name().to_string(),
                required: growth,
                available: node.available_space(),
            };
            return Err(self.reject_write(id, err));
        }

        if let Some(object) = self.objects.get_mut(id) {
            object.record_write(timestamp, &mut *self.rng);
        }

        let mut pending = holders;
        let mut resized = Vec::with_capacity(pending.len());
        let mut budget = RetryBudget::new("replica overwrite", &self.retry);
        let mut elapsed = 0.0;

        while !pending.is_empty() {
            let pick = pick_index(&mut *self.rng, pending.len());
            let node_id = pending[pick];
            let outcome = match self.nodes.node_mut(node_id) {
                Ok(node) => match node.write(id, size_kb, true, &mut *self.rng) {
                    Ok(t) => Ok(Some(t)),
                    Err(err) if err.is_transient() => {
                        elapsed += node.error_response_time();
                        self.sink.record(StorageEvent::Fault {
                            location: node.name().to_string(),
                            operation: Operation::Write,
                            id: id.clone(),
                            error: err.to_string(),
                        });
                        budget.record_failure().map(|()| None)
                    }
                    Err(err) => Err(err),
                },
                Err(err) => Err(err),
            };
            match outcome {
                Ok(Some(t)) => {
                    elapsed += t;
                    resized.push(node_id);
                    pending.remove(pick);
                }
                Ok(None) => {}
                Err(err) => {
                    self.restore_replicas(id, &resized, old_size);
                    return Err(self.reject_write(id, err));
                }
            }
        }

        if let Some(object) = self.objects.get_mut(id) {
            object.set_size(size_kb);
        }
        self.stats.successful_writes += 1;
        self.sink.record(StorageEvent::Overwritten {
            id: id.clone(),
            tier,
            size_kb,
            elapsed_ms: elapsed,
        });
        Ok(elapsed)
    }

    /// Read a live object from one of its replicas, returning elapsed ms
    pub fn read(&mut self, id: &ObjectId, timestamp: u64) -> Result<f64> {
        let holders = match self.replicas.get(id) {
            Some(holders) if self.has_data(id) && !holders.is_empty() => holders.clone(),
            _ => return Err(self.reject_read(id, Error::NotFound(id.clone()))),
        };

        if let Some(object) = self.objects.get_mut(id) {
            object.record_read(timestamp, &mut *self.rng);
        }

        let mut budget = RetryBudget::new("replica read", &self.retry);
        let mut elapsed = 0.0;
        loop {
            let pick = pick_index(&mut *self.rng, holders.len());
            let node = self.nodes.node_mut(holders[pick])?;
            match node.read(id, &mut *self.rng) {
                Ok(t) => {
                    elapsed += t;
                    break;
                }
                Err(err) if err.is_transient() => {
                    elapsed += node.error_response_time();
                    self.sink.record(StorageEvent::Fault {
                        location: node.name().to_string(),
                        operation: Operation::Read,
                        id: id.clone(),
                        error: err.to_string(),
                    });
                    if let Err(limit) = budget.record_failure() {
                        return Err(self.reject_read(id, limit));
                    }
                }
                Err(err) => return Err(self.reject_read(id, err)),
            }
        }

        self.stats.successful_reads += 1;
        debug!(%id, elapsed_ms = elapsed, retries = budget.failures(), "object read");
        Ok(elapsed)
    }

    /// Delete every replica of a live object and soft-delete it
    pub fn delete(&mut self, id: &ObjectId, timestamp: u64) -> Result<f64> {
        if !self.has_data(id) {
            return Err(self.reject(Operation::Delete, id, Error::NotFound(id.clone())));
        }

        let mut pending = self.replicas.remove(id).unwrap_or_default();
        let mut budget = RetryBudget::new("replica delete", &self.retry);
        let mut elapsed = 0.0;

        while !pending.is_empty() {
            let pick = pick_index(&mut *self.rng, pending.len());
            let node_id = pending[pick];
            let node = match self.nodes.node_mut(node_id) {
                Ok(node) => node,
                Err(err) => {
                    self.replicas.insert(id.clone(), pending);
                    return Err(err);
                }
            };
            match node.delete(id, &mut *self.rng) {
                Ok(t) => {
                    elapsed += t;
                    pending.remove(pick);
                }
                Err(err) if err.is_transient() => {
                    elapsed += node.error_response_time();
                    self.sink.record(StorageEvent::Fault {
                        location: node.name().to_string(),
                        operation: Operation::Delete,
                        id: id.clone(),
                        error: err.to_string(),
                    });
                    if let Err(limit) = budget.record_failure() {
                        self.replicas.insert(id.clone(), pending);
                        return Err(self.reject(Operation::Delete, id, limit));
                    }
                }
                Err(err) => {
                    self.replicas.insert(id.clone(), pending);
                    return Err(self.reject(Operation::Delete, id, err));
                }
            }
        }

        if let Some(object) = self.objects.get_mut(id) {
            object.record_delete(timestamp, &mut *self.rng);
            object.mark_deleted();
        }
        debug!(%id, elapsed_ms = elapsed, retries = budget.failures(), "object deleted");
        Ok(elapsed)
    }

    /// Clear the catalog, replica map, counters and every node
    pub fn reset(&mut self) {
        self.objects.clear();
        self.replicas.clear();
        self.stats = DataStats::default();
        self.nodes.reset();
        debug!("data manager reset");
    }

    // Undo a partial overwrite so every replica matches the catalog size
    fn restore_replicas(&mut self, id: &ObjectId, nodes: &[NodeId], size_kb: u64) {
        for node_id in nodes {
            if let Some(node) = self.nodes.get_node_mut(*node_id)
                && !node.restore_replica(id, size_kb)
            {
                warn!(node = %node.name(), %id, "replica vanished during overwrite rollback");
            }
        }
        if !nodes.is_empty() {
            debug!(%id, restored = nodes.len(), size_kb, "partial overwrite rolled back");
        }
    }

    fn reject_write(&mut self, id: &ObjectId, err: Error) -> Error {
        self.stats.unsuccessful_writes += 1;
        self.reject(Operation::Write, id, err)
    }

    fn reject_read(&mut self, id: &ObjectId, err: Error) -> Error {
        self.stats.unsuccessful_reads += 1;
        self.reject(Operation::Read, id, err)
    }

    fn reject(&self, operation: Operation, id: &ObjectId, err: Error) -> Error {
        self.sink.record(StorageEvent::Rejected {
            operation,
            id: id.clone(),
            error: err.to_string(),
        });
        err
    }
}
