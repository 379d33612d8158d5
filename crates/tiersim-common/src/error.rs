//! Error types for tiersim
//!
//! This module defines the error taxonomy shared by the storage engine,
//! the placement strategies and the driver.

use crate::types::{ObjectId, Tier, format_size};
use thiserror::Error;

/// Common result type for tiersim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for tiersim
#[derive(Debug, Error)]
pub enum Error {
    // Terminal data errors
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("object already exists on {location}: {id}")]
    AlreadyExists { id: ObjectId, location: String },

    #[error(
        "insufficient capacity on {location}: required {}, available {}",
        format_kb(.required),
        format_kb(.available)
    )]
    InsufficientCapacity {
        location: String,
        required: u64,
        available: u64,
    },

    // Transient faults (retried inside the engine)
    #[error("storage medium {0} is currently unavailable")]
    MediumUnavailable(String),

    #[error("a failure occurred on storage medium {0} during the operation")]
    MediumFailure(String),

    #[error("storage node {0} is currently unavailable")]
    NodeUnavailable(String),

    #[error("a failure occurred on storage node {0} during the operation")]
    NodeFailure(String),

    // Placement errors
    #[error(
        "no storage available for data size {} | {}",
        format_kb(.required),
        format_tier_availability(.available)
    )]
    NoStorageAvailable {
        required: u64,
        available: Vec<(Tier, u64)>,
    },

    #[error("{operation} gave up after {attempts} failed attempts")]
    RetryLimitExceeded { operation: String, attempts: u32 },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    // Internal errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn format_kb(size: &u64) -> String {
    format_size(*size)
}

fn format_tier_availability(available: &[(Tier, u64)]) -> String {
    available
        .iter()
        .map(|(tier, free)| format!("{tier}: {}", format_size(*free)))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a not found error for an object
    pub fn not_found(id: impl Into<ObjectId>) -> Self {
        Self::NotFound(id.into())
    }

    /// Check if this is a transient fault that the engine retries
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::MediumUnavailable(_)
                | Self::MediumFailure(_)
                | Self::NodeUnavailable(_)
                | Self::NodeFailure(_)
        )
    }

    /// Check if this is a node-level transient fault
    #[must_use]
    pub const fn is_node_fault(&self) -> bool {
        matches!(self, Self::NodeUnavailable(_) | Self::NodeFailure(_))
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NodeNotFound(_))
    }

    /// Check if this error reports missing space
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity { .. } | Self::NoStorageAvailable { .. }
        )
    }
}
