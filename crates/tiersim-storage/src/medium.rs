//! Single storage medium (one NVMe, SSD or HDD device)
//!
//! A medium only simulates timing, capacity and faults. It keeps the size of
//! every object it holds and never touches real data.

use rand::{Rng, RngCore};
use serde::Serialize;
use std::collections::HashMap;
use tiersim_common::config::MediumConfig;
use tiersim_common::{Error, MediumKind, ObjectId, Result};

/// Per-medium operation counters
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MediumStats {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    /// Requests refused because the medium was unavailable
    pub unavailable: u64,
    /// Requests that hit a random failure
    pub failures: u64,
    pub read_time_ms: f64,
    pub write_time_ms: f64,
    pub delete_time_ms: f64,
}

/// A simulated storage device
#[derive(Clone, Debug)]
pub struct StorageMedium {
    name: String,
    kind: MediumKind,
    config: MediumConfig,
    used_capacity: u64,
    objects: HashMap<ObjectId, u64>,
    stats: MediumStats,
}

impl StorageMedium {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MediumKind, config: MediumConfig) -> Self {
        Self {
            name: name.into(),
            kind,
            config,
            used_capacity: 0,
            objects: HashMap::new(),
            stats: MediumStats::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> MediumKind {
        self.kind
    }

    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.config.capacity_kb
    }

    #[must_use]
    pub const fn used_capacity(&self) -> u64 {
        self.used_capacity
    }

    #[must_use]
    pub const fn available_space(&self) -> u64 {
        self.config.capacity_kb.saturating_sub(self.used_capacity)
    }

    #[must_use]
    pub fn has_data(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Size of a stored object
    #[must_use]
    pub fn object_size(&self, id: &ObjectId) -> Option<u64> {
        self.objects.get(id).copied()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub const fn stats(&self) -> &MediumStats {
        &self.stats
    }

    /// Power draw in watts
    #[must_use]
    pub const fn power_usage(&self, active: bool) -> f64 {
        if active {
            self.config.power_watts.0
        } else {
            self.config.power_watts.1
        }
    }

    /// Write or overwrite an object, returning the elapsed time in ms
    pub fn write(
        &mut self,
        id: &ObjectId,
        size_kb: u64,
        overwrite: bool,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        self.check_faults(rng)?;

        let old_size = match self.objects.get(id) {
            Some(_) if !overwrite => {
                return Err(Error::AlreadyExists {
                    id: id.clone(),
                    location: self.name.clone(),
                });
            }
            Some(size) => *size,
            None => 0,
        };

        if size_kb > old_size && size_kb - old_size > self.available_space() {
            return Err(Error::InsufficientCapacity {
                location: self.name.clone(),
                required: size_kb - old_size,
                available: self.available_space(),
            });
        }

        self.used_capacity = self.used_capacity - old_size + size_kb;
        self.objects.insert(id.clone(), size_kb);

        let elapsed = transfer_time(
            rng,
            self.config.write_latency_ms,
            self.config.write_throughput,
            size_kb,
        );
        self.stats.writes += 1;
        self.stats.write_time_ms += elapsed;
        Ok(elapsed)
    }

    /// Read an object, returning the elapsed time in ms
    pub fn read(&mut self, id: &ObjectId, rng: &mut dyn RngCore) -> Result<f64> {
        self.check_faults(rng)?;

        let size_kb = self
            .object_size(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;

        let elapsed = transfer_time(
            rng,
            self.config.read_latency_ms,
            self.config.read_throughput,
            size_kb,
        );
        self.stats.reads += 1;
        self.stats.read_time_ms += elapsed;
        Ok(elapsed)
    }

    /// Delete an object, returning the elapsed time in ms
    pub fn delete(&mut self, id: &ObjectId, rng: &mut dyn RngCore) -> Result<f64> {
        self.check_faults(rng)?;

        let size_kb = self
            .objects
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.used_capacity -= size_kb;

        let elapsed = sample_uniform(rng, self.config.delete_latency_ms);
        self.stats.deletes += 1;
        self.stats.delete_time_ms += elapsed;
        Ok(elapsed)
    }

    /// Drop an object without simulating a request
    ///
    /// Used when a node relocates an overwritten object to another medium.
    pub(crate) fn evict(&mut self, id: &ObjectId) -> Option<u64> {
        let size_kb = self.objects.remove(id)?;
        self.used_capacity -= size_kb;
        Some(size_kb)
    }

    /// Set an object's stored size without simulating a request
    ///
    /// Used to undo a partially applied overwrite. Returns false when the
    /// medium does not hold the object.
    pub(crate) fn restore(&mut self, id: &ObjectId, size_kb: u64) -> bool {
        let Some(stored) = self.objects.get_mut(id) else {
            return false;
        };
        self.used_capacity = self.used_capacity.saturating_sub(*stored) + size_kb;
        *stored = size_kb;
        true
    }

    /// Clear all contents and counters
    pub fn reset(&mut self) {
        self.objects.clear();
        self.used_capacity = 0;
        self.stats = MediumStats::default();
    }

    fn check_faults(&mut self, rng: &mut dyn RngCore) -> Result<()> {
        if !sample_bernoulli(rng, self.config.availability) {
            self.stats.unavailable += 1;
            return Err(Error::MediumUnavailable(self.name.clone()));
        }
        if sample_bernoulli(rng, self.config.error_rate) {
            self.stats.failures += 1;
            return Err(Error::MediumFailure(self.name.clone()));
        }
        Ok(())
    }
}

/// Draw `true` with probability `p`, never for NaN
pub(crate) fn sample_bernoulli(rng: &mut dyn RngCore, p: f64) -> bool {
    !p.is_nan() && rng.gen_bool(p.clamp(0.0, 1.0))
}

/// Draw uniformly from an inclusive `(min, max)` range
pub(crate) fn sample_uniform(rng: &mut dyn RngCore, (min, max): (f64, f64)) -> f64 {
    if min >= max {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

/// Pick a random index into a non-empty collection of `len` items
pub(crate) fn pick_index(rng: &mut dyn RngCore, len: usize) -> usize {
    rng.gen_range(0..len)
}

#[allow(clippy::cast_precision_loss)]
fn transfer_time(
    rng: &mut dyn RngCore,
    latency: (f64, f64),
    throughput: (f64, f64),
    size_kb: u64,
) -> f64 {
    let latency = sample_uniform(rng, latency);
    let throughput = sample_uniform(rng, throughput);
    latency + size_kb as f64 / throughput
}
