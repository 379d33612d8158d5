//! Configuration types for tiersim
//!
//! This module defines the static configuration consumed at startup: the
//! cluster shape, per-medium-type hardware characteristics, per-tier node
//! characteristics and the retry guard. Every section has defaults so a
//! partial configuration file only needs to name what it changes.

use crate::error::{Error, Result};
use crate::types::{GB, MediumKind, Tier};
use serde::{Deserialize, Serialize};

/// Root configuration for tiersim
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cluster shape and replication
    pub cluster: ClusterConfig,
    /// Hardware characteristics per medium type
    pub media: MediaConfig,
    /// Node characteristics per tier
    pub tiers: TiersConfig,
    /// Retry guard for the engine's retry loops
    pub retry: RetryConfig,
}

impl Config {
    /// Node configuration for a tier
    #[must_use]
    pub const fn tier(&self, tier: Tier) -> &TierNodeConfig {
        match tier {
            Tier::Fast => &self.tiers.fast,
            Tier::Medium => &self.tiers.medium,
            Tier::Slow => &self.tiers.slow,
        }
    }

    /// Medium configuration for a medium kind
    #[must_use]
    pub const fn medium(&self, kind: MediumKind) -> &MediumConfig {
        match kind {
            MediumKind::Nvme => &self.media.nvme,
            MediumKind::Ssd => &self.media.ssd,
            MediumKind::Hdd => &self.media.hdd,
        }
    }

    /// Mutable medium configuration for a medium kind
    pub const fn medium_mut(&mut self, kind: MediumKind) -> &mut MediumConfig {
        match kind {
            MediumKind::Nvme => &mut self.media.nvme,
            MediumKind::Ssd => &mut self.media.ssd,
            MediumKind::Hdd => &mut self.media.hdd,
        }
    }

    /// Mutable node configuration for a tier
    pub const fn tier_mut(&mut self, tier: Tier) -> &mut TierNodeConfig {
        match tier {
            Tier::Fast => &mut self.tiers.fast,
            Tier::Medium => &mut self.tiers.medium,
            Tier::Slow => &mut self.tiers.slow,
        }
    }

    /// Validate probabilities, ranges and counts
    pub fn validate(&self) -> Result<()> {
        if self.cluster.replication_factor == 0 {
            return Err(Error::configuration("replication_factor must be at least 1"));
        }
        if self.cluster.media_per_node == 0 {
            return Err(Error::configuration("media_per_node must be at least 1"));
        }
        check_non_negative("cluster.error_response_time_ms", self.cluster.error_response_time_ms)?;
        if self.retry.max_attempts == Some(0) {
            return Err(Error::configuration("retry.max_attempts must be at least 1"));
        }

        for kind in [MediumKind::Nvme, MediumKind::Ssd, MediumKind::Hdd] {
            self.medium(kind).validate(kind)?;
        }
        for tier in Tier::ALL {
            self.tier(tier).validate(tier)?;
        }
        Ok(())
    }
}

/// Cluster shape configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of FAST (NVMe) nodes
    pub fast_nodes: usize,
    /// Number of MEDIUM (SSD) nodes
    pub medium_nodes: usize,
    /// Number of SLOW (HDD) nodes
    pub slow_nodes: usize,
    /// Number of replicas created per object on a fresh write
    pub replication_factor: usize,
    /// Number of media attached to every node
    pub media_per_node: usize,
    /// Time (ms) charged by a caller for every caught transient fault
    pub error_response_time_ms: f64,
    /// Seed for the fault-injection random stream (random if unset)
    pub seed: Option<u64>,
}

impl ClusterConfig {
    /// Number of nodes configured for a tier
    #[must_use]
    pub const fn node_count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Fast => self.fast_nodes,
            Tier::Medium => self.medium_nodes,
            Tier::Slow => self.slow_nodes,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            fast_nodes: 3,
            medium_nodes: 3,
            slow_nodes: 3,
            replication_factor: 3,
            media_per_node: 1,
            error_response_time_ms: 5.0,
            seed: None,
        }
    }
}

/// Hardware characteristics of every medium type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub nvme: MediumConfig,
    pub ssd: MediumConfig,
    pub hdd: MediumConfig,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            nvme: MediumConfig::nvme(),
            ssd: MediumConfig::ssd(),
            hdd: MediumConfig::hdd(),
        }
    }
}

/// Hardware characteristics of one medium type
///
/// Latencies are in milliseconds, throughputs in KB/ms and capacity in KB.
/// Every `(min, max)` pair is sampled uniformly per operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediumConfig {
    pub capacity_kb: u64,
    pub read_latency_ms: (f64, f64),
    pub write_latency_ms: (f64, f64),
    pub delete_latency_ms: (f64, f64),
    pub read_throughput: (f64, f64),
    pub write_throughput: (f64, f64),
    /// Probability that the medium answers a request
    pub availability: f64,
    /// Probability that an answered request fails
    pub error_rate: f64,
    /// Power draw in watts: (active, idle)
    pub power_watts: (f64, f64),
}

impl MediumConfig {
    /// NVMe flash defaults
    #[must_use]
    pub const fn nvme() -> Self {
        Self {
            capacity_kb: 25 * GB,
            read_latency_ms: (0.1, 0.3),
            write_latency_ms: (0.4, 0.6),
            delete_latency_ms: (0.05, 0.1),
            read_throughput: (1536.0, 3584.0),
            write_throughput: (1024.0, 3072.0),
            availability: 0.99,
            error_rate: 1e-15,
            power_watts: (5.5, 0.1),
        }
    }

    /// SATA SSD defaults
    #[must_use]
    pub const fn ssd() -> Self {
        Self {
            capacity_kb: 50 * GB,
            read_latency_ms: (0.2, 0.4),
            write_latency_ms: (0.5, 0.7),
            delete_latency_ms: (0.1, 0.2),
            read_throughput: (512.0, 614.0),
            write_throughput: (410.0, 512.0),
            availability: 0.95,
            error_rate: 1e-14,
            power_watts: (3.0, 0.05),
        }
    }

    /// Spinning disk defaults
    #[must_use]
    pub const fn hdd() -> Self {
        Self {
            capacity_kb: 75 * GB,
            read_latency_ms: (1.0, 3.0),
            write_latency_ms: (4.0, 6.0),
            delete_latency_ms: (0.5, 1.0),
            read_throughput: (123.0, 164.0),
            write_throughput: (102.0, 154.0),
            availability: 0.90,
            error_rate: 1e-12,
            power_watts: (7.0, 1.0),
        }
    }

    fn validate(&self, kind: MediumKind) -> Result<()> {
        let ctx = |field: &str| format!("media.{}.{field}", kind.to_string().to_ascii_lowercase());
        check_probability(&ctx("availability"), self.availability)?;
        check_probability(&ctx("error_rate"), self.error_rate)?;
        check_range(&ctx("read_latency_ms"), self.read_latency_ms, false)?;
        check_range(&ctx("write_latency_ms"), self.write_latency_ms, false)?;
        check_range(&ctx("delete_latency_ms"), self.delete_latency_ms, false)?;
        check_range(&ctx("read_throughput"), self.read_throughput, true)?;
        check_range(&ctx("write_throughput"), self.write_throughput, true)?;
        check_non_negative(&ctx("power_watts.active"), self.power_watts.0)?;
        check_non_negative(&ctx("power_watts.idle"), self.power_watts.1)?;
        Ok(())
    }
}

/// Node characteristics of every tier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersConfig {
    pub fast: TierNodeConfig,
    pub medium: TierNodeConfig,
    pub slow: TierNodeConfig,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            fast: TierNodeConfig::fast(),
            medium: TierNodeConfig::medium(),
            slow: TierNodeConfig::slow(),
        }
    }
}

/// Node characteristics of one tier
///
/// Costs are flat per operation, times are in milliseconds and network
/// speed is in KB/ms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierNodeConfig {
    pub read_cost: f64,
    pub write_cost: f64,
    pub delete_cost: f64,
    pub process_time_ms: f64,
    pub inter_node_latency_ms: f64,
    pub network_speed: f64,
    /// Probability that the node answers a request
    pub availability: f64,
    /// Probability that an answered request fails
    pub failure_rate: f64,
    pub network_read_latency_ms: f64,
    pub network_write_latency_ms: f64,
    pub network_delete_latency_ms: f64,
}

impl TierNodeConfig {
    /// FAST tier defaults
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            read_cost: 0.000_000_4,
            write_cost: 0.000_000_5,
            delete_cost: 0.000_000_3,
            process_time_ms: 500.0,
            inter_node_latency_ms: 1000.0,
            network_speed: 1_220_703.0,
            availability: 0.99,
            failure_rate: 1e-15,
            network_read_latency_ms: 0.05,
            network_write_latency_ms: 0.1,
            network_delete_latency_ms: 0.02,
        }
    }

    /// MEDIUM tier defaults
    #[must_use]
    pub const fn medium() -> Self {
        Self {
            read_cost: 0.000_000_1,
            write_cost: 0.000_000_2,
            delete_cost: 0.000_000_1,
            process_time_ms: 1000.0,
            inter_node_latency_ms: 5000.0,
            network_speed: 610_351.0,
            availability: 0.95,
            failure_rate: 1e-14,
            network_read_latency_ms: 0.1,
            network_write_latency_ms: 0.2,
            network_delete_latency_ms: 0.05,
        }
    }

    /// SLOW tier defaults
    #[must_use]
    pub const fn slow() -> Self {
        Self {
            read_cost: 0.000_000_02,
            write_cost: 0.000_000_03,
            delete_cost: 0.000_000_01,
            process_time_ms: 2000.0,
            inter_node_latency_ms: 10000.0,
            network_speed: 122_070.0,
            availability: 0.90,
            failure_rate: 1e-12,
            network_read_latency_ms: 0.2,
            network_write_latency_ms: 0.3,
            network_delete_latency_ms: 0.1,
        }
    }

    fn validate(&self, tier: Tier) -> Result<()> {
        let ctx = |field: &str| format!("tiers.{}.{field}", tier.as_lowercase());
        check_probability(&ctx("availability"), self.availability)?;
        check_probability(&ctx("failure_rate"), self.failure_rate)?;
        for (field, value) in [
            ("read_cost", self.read_cost),
            ("write_cost", self.write_cost),
            ("delete_cost", self.delete_cost),
            ("process_time_ms", self.process_time_ms),
            ("inter_node_latency_ms", self.inter_node_latency_ms),
            ("network_read_latency_ms", self.network_read_latency_ms),
            ("network_write_latency_ms", self.network_write_latency_ms),
            ("network_delete_latency_ms", self.network_delete_latency_ms),
        ] {
            check_non_negative(&ctx(field), value)?;
        }
        if !(self.network_speed.is_finite() && self.network_speed > 0.0) {
            return Err(Error::configuration(format!(
                "{} must be positive, got {}",
                ctx("network_speed"),
                self.network_speed
            )));
        }
        Ok(())
    }
}

/// Retry guard for the engine's retry loops
///
/// `max_attempts = None` keeps the unbounded behavior: a loop retries until
/// an attempt succeeds, which terminates almost surely because every attempt
/// has a positive success probability. Setting a limit turns an exhausted
/// loop into [`Error::RetryLimitExceeded`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum failed attempts per retry loop
    pub max_attempts: Option<u32>,
}

fn check_probability(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{field} must be within [0, 1], got {value}"
        )))
    }
}

/// Finite and at least zero
fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{field} must not be negative, got {value}"
        )))
    }
}

fn check_range(field: &str, (min, max): (f64, f64), positive: bool) -> Result<()> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(Error::configuration(format!(
            "{field} must be finite, got ({min}, {max})"
        )));
    }
    if min > max {
        return Err(Error::configuration(format!(
            "{field} range is inverted: ({min}, {max})"
        )));
    }
    if positive && min <= 0.0 {
        return Err(Error::configuration(format!(
            "{field} must be positive, got ({min}, {max})"
        )));
    }
    if !positive && min < 0.0 {
        return Err(Error::configuration(format!(
            "{field} must not be negative, got ({min}, {max})"
        )));
    }
    Ok(())
}
