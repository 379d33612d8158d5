//! Engine event reporting
//!
//! Nodes and the data manager report what happened through an injected
//! [`EventSink`] instead of logging directly. [`TracingSink`] forwards to
//! `tracing`; [`MemorySink`] keeps events for inspection in tests.

use parking_lot::Mutex;
use serde::Serialize;
use tiersim_common::{ObjectId, Operation, Tier};
use tracing::{debug, warn};

/// Something observable that happened inside the engine
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StorageEvent {
    /// A node completed an operation
    NodeOp {
        node: String,
        operation: Operation,
        id: ObjectId,
        elapsed_ms: f64,
    },
    /// A transient fault was caught and will be retried
    Fault {
        location: String,
        operation: Operation,
        id: ObjectId,
        error: String,
    },
    /// A fresh write finished placing replicas
    Placed {
        id: ObjectId,
        tier: Tier,
        replicas: usize,
        target: usize,
        elapsed_ms: f64,
    },
    /// An existing object was rewritten in place
    Overwritten {
        id: ObjectId,
        tier: Tier,
        size_kb: u64,
        elapsed_ms: f64,
    },
    /// An object moved between tiers
    Migrated { id: ObjectId, from: Tier, to: Tier },
    /// An operation was refused with a terminal error
    Rejected {
        operation: Operation,
        id: ObjectId,
        error: String,
    },
}

/// Receiver for engine events
pub trait EventSink: Send + Sync {
    fn record(&self, event: StorageEvent);
}

/// Forwards every event to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: StorageEvent) {
        match event {
            StorageEvent::NodeOp {
                node,
                operation,
                id,
                elapsed_ms,
            } => debug!(%node, %operation, %id, elapsed_ms, "node operation completed"),
            StorageEvent::Fault {
                location,
                operation,
                id,
                error,
            } => debug!(%location, %operation, %id, %error, "transient fault, retrying"),
            StorageEvent::Placed {
                id,
                tier,
                replicas,
                target,
                elapsed_ms,
            } => {
                if replicas < target {
                    warn!(%id, %tier, replicas, target, elapsed_ms, "object under-replicated");
                } else {
                    debug!(%id, %tier, replicas, elapsed_ms, "object placed");
                }
            }
            StorageEvent::Overwritten {
                id,
                tier,
                size_kb,
                elapsed_ms,
            } => debug!(%id, %tier, size_kb, elapsed_ms, "object overwritten"),
            StorageEvent::Migrated { id, from, to } => {
                debug!(%id, %from, %to, "object migrated between tiers");
            }
            StorageEvent::Rejected {
                operation,
                id,
                error,
            } => debug!(%operation, %id, %error, "operation rejected"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<StorageEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<StorageEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events matching `pred`
    pub fn count(&self, pred: impl Fn(&StorageEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: StorageEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.record(StorageEvent::Migrated {
            id: "a".into(),
            from: Tier::Fast,
            to: Tier::Slow,
        });
        sink.record(StorageEvent::Rejected {
            operation: Operation::Read,
            id: "b".into(),
            error: "object not found: b".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StorageEvent::Migrated { .. }));
        assert_eq!(
            sink.count(|e| matches!(e, StorageEvent::Rejected { .. })),
            1
        );

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingSink;
        sink.record(StorageEvent::Placed {
            id: "a".into(),
            tier: Tier::Fast,
            replicas: 1,
            target: 3,
            elapsed_ms: 1.0,
        });
        sink.record(StorageEvent::Fault {
            location: "fast_node_0".into(),
            operation: Operation::Write,
            id: "a".into(),
            error: "unavailable".into(),
        });
    }
}
