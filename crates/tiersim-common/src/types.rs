//! Core type definitions for tiersim
//!
//! This module defines the fundamental types used throughout the system
//! including identifiers, tiers, medium kinds and size helpers.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One kilobyte, the base unit for all sizes in the simulator
pub const KB: u64 = 1;
/// One megabyte in KB
pub const MB: u64 = 1024 * KB;
/// One gigabyte in KB
pub const GB: u64 = 1024 * MB;
/// One terabyte in KB
pub const TB: u64 = 1024 * GB;

/// Identifier of a stored object (the trace's `file_id`)
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
#[display("{_0}")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an object ID from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:?})", self.0)
    }
}

/// Unique identifier for a storage node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, From, Into)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a new random node ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage tier (performance/cost class)
///
/// Ordering follows performance: `Fast < Medium < Slow`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// NVMe-backed nodes
    Fast,
    /// SSD-backed nodes
    Medium,
    /// HDD-backed nodes
    Slow,
}

impl Tier {
    /// All tiers, fastest first
    pub const ALL: [Self; 3] = [Self::Fast, Self::Medium, Self::Slow];

    /// Medium technology backing this tier
    #[must_use]
    pub const fn medium_kind(self) -> MediumKind {
        match self {
            Self::Fast => MediumKind::Nvme,
            Self::Medium => MediumKind::Ssd,
            Self::Slow => MediumKind::Hdd,
        }
    }

    /// Weight of this tier in the estimated system response
    #[must_use]
    pub const fn esr_weight(self) -> f64 {
        match self {
            Self::Fast => 10.0,
            Self::Medium => 2.0,
            Self::Slow => 1.0,
        }
    }

    /// Lowercase name used for node and medium names
    #[must_use]
    pub const fn as_lowercase(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "FAST"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Slow => write!(f, "SLOW"),
        }
    }
}

impl FromStr for Tier {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" | "nvme" => Ok(Self::Fast),
            "medium" | "ssd" => Ok(Self::Medium),
            "slow" | "hdd" => Ok(Self::Slow),
            other => Err(crate::Error::invalid_argument(format!("unknown tier: {other}"))),
        }
    }
}

/// Physical medium technology
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumKind {
    Nvme,
    Ssd,
    Hdd,
}

impl fmt::Display for MediumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nvme => write!(f, "NVMe"),
            Self::Ssd => write!(f, "SSD"),
            Self::Hdd => write!(f, "HDD"),
        }
    }
}

/// Kind of data operation issued against the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Format a size given in KB as a human-readable KB/MB/GB string
#[must_use]
pub fn format_size(size_kb: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let size = size_kb as f64;
    if size_kb < MB {
        format!("{size:.2} KB")
    } else if size_kb < GB {
        format!("{:.2} MB", size / MB as f64)
    } else {
        format!("{:.2} GB", size / GB as f64)
    }
}
