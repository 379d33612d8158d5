//! tiersim Storage Engine - simulated tiered replicated storage
//!
//! This crate implements the storage engine the simulator replays traces
//! against:
//! - Storage media with sampled latency, throughput and fault injection
//! - Storage nodes grouping media with network and cost accounting
//! - Node and capacity registries grouped by tier
//! - Replica placement, overwrite, read and delete with retry on faults
//! - Per-object access history and temperature
//! - Read-only run metrics and the Estimated System Response
//!
//! No real I/O happens: every operation returns its simulated elapsed time
//! in milliseconds.

pub mod capacity;
pub mod data_manager;
pub mod events;
pub mod medium;
pub mod metrics;
pub mod node;
pub mod node_manager;
pub mod object;
pub mod retry;
pub mod system;

// Re-exports
pub use capacity::CapacityManager;
pub use data_manager::{DataManager, DataStats};
pub use events::{EventSink, MemorySink, StorageEvent, TracingSink};
pub use medium::{MediumStats, StorageMedium};
pub use metrics::{MetricsCalculator, NodeReport, ObjectReport, RunSummary, TierReport};
pub use node::{NodeStats, StorageNode};
pub use node_manager::{NodeManager, TierCapacity};
pub use object::DataObject;
pub use retry::RetryBudget;
pub use system::StorageSystem;
