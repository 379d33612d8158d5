//! Catalog entry for a stored object and its temperature model

use crate::medium::sample_bernoulli;
use rand::RngCore;
use serde::Serialize;
use tiersim_common::ObjectId;

/// Probability that any access turns an object fully hot
pub const HOT_JUMP_PROBABILITY: f64 = 0.01;
/// Hotness lost per decay step
pub const DECAY_STEP: f64 = 0.1;
/// Idle time units before hotness decays
pub const DECAY_IDLE_TIME: u64 = 5;

// exp() overflows past this; both curves saturate to 1.0 instead
const MAX_EXPONENT: f64 = 700.0;

/// Per-object access history and hotness
///
/// A new object starts deleted and cold. It becomes live on its first
/// successful write and stays in the catalog after a delete.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataObject {
    id: ObjectId,
    size_kb: u64,
    deleted: bool,
    reads: u64,
    writes: u64,
    deletes: u64,
    last_access: u64,
    hotness: f64,
}

impl DataObject {
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, size_kb: u64) -> Self {
        Self {
            id: id.into(),
            size_kb,
            deleted: true,
            reads: 0,
            writes: 0,
            deletes: 0,
            last_access: 0,
            hotness: 0.0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ObjectId {
        &self.id
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size_kb
    }

    pub const fn set_size(&mut self, size_kb: u64) {
        self.size_kb = size_kb;
    }

    /// Live (written and not deleted)
    #[must_use]
    pub const fn has_data(&self) -> bool {
        !self.deleted
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub const fn mark_written(&mut self) {
        self.deleted = false;
    }

    pub const fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    #[must_use]
    pub const fn reads(&self) -> u64 {
        self.reads
    }

    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    #[must_use]
    pub const fn deletes(&self) -> u64 {
        self.deletes
    }

    #[must_use]
    pub const fn total_accesses(&self) -> u64 {
        self.reads + self.writes + self.deletes
    }

    #[must_use]
    pub const fn last_access(&self) -> u64 {
        self.last_access
    }

    #[must_use]
    pub const fn hotness(&self) -> f64 {
        self.hotness
    }

    /// Set the hotness level, clamped to [0, 1]
    pub fn set_hotness(&mut self, hotness: f64) {
        self.hotness = hotness.clamp(0.0, 1.0);
    }

    pub fn record_read(&mut self, timestamp: u64, rng: &mut dyn RngCore) {
        self.reads += 1;
        self.on_access(timestamp, rng);
    }

    pub fn record_write(&mut self, timestamp: u64, rng: &mut dyn RngCore) {
        self.writes += 1;
        self.on_access(timestamp, rng);
    }

    pub fn record_delete(&mut self, timestamp: u64, rng: &mut dyn RngCore) {
        self.deletes += 1;
        self.on_access(timestamp, rng);
    }

    /// Cool down by one step if idle for at least [`DECAY_IDLE_TIME`]
    pub fn decay_temperature(&mut self, timestamp: u64) {
        if timestamp.saturating_sub(self.last_access) >= DECAY_IDLE_TIME {
            self.hotness = (self.hotness - DECAY_STEP).max(0.0);
        }
    }

    /// Current temperature in [0, 1]
    ///
    /// Combines an access-count curve, a size-weighted intensity curve and
    /// the hotness level, whichever is highest.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn temperature(&self) -> f64 {
        let accesses = self.total_accesses() as f64;

        let access_exp = 0.01 * accesses;
        let access_curve = if access_exp > MAX_EXPONENT {
            1.0
        } else {
            1.0 - 0.5 / access_exp.exp()
        };

        let intensity_exp = 5.0 * (self.size_kb as f64 / 1000.0) * accesses;
        let intensity = if intensity_exp > MAX_EXPONENT {
            1.0
        } else {
            let e = intensity_exp.exp();
            e / (1.0 + e)
        };

        let derived = if intensity > 0.8 {
            access_curve
        } else {
            intensity
        };
        derived.max(self.hotness)
    }

    fn on_access(&mut self, timestamp: u64, rng: &mut dyn RngCore) {
        self.decay_temperature(timestamp);
        self.last_access = timestamp;
        if self.hotness < 1.0 && sample_bernoulli(rng, HOT_JUMP_PROBABILITY) {
            self.hotness = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    // StepRng(0, 0) always yields 0, so every Bernoulli draw succeeds
    fn always_hot() -> StepRng {
        StepRng::new(0, 0)
    }

    // StepRng(MAX, 0) always yields u64::MAX, so p = 0.01 never fires
    fn never_hot() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_lifecycle() {
        let mut rng = never_hot();
        let mut obj = DataObject::new("a", 10);
        assert!(obj.is_deleted());
        assert!(!obj.has_data());

        obj.mark_written();
        obj.record_write(1, &mut rng);
        assert!(obj.has_data());

        obj.record_delete(2, &mut rng);
        obj.mark_deleted();
        assert!(!obj.has_data());
        assert_eq!(obj.total_accesses(), 2);
        assert_eq!(obj.last_access(), 2);
    }

    #[test]
    fn test_hot_jump() {
        let mut obj = DataObject::new("a", 10);
        obj.record_read(0, &mut never_hot());
        assert!(obj.hotness().abs() < f64::EPSILON);

        obj.record_read(1, &mut always_hot());
        assert!((obj.hotness() - 1.0).abs() < f64::EPSILON);
        assert!((obj.temperature() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decay_after_idle() {
        let mut rng = never_hot();
        let mut obj = DataObject::new("a", 10);
        obj.record_read(10, &mut rng);
        obj.set_hotness(0.5);

        obj.decay_temperature(14);
        assert!((obj.hotness() - 0.5).abs() < f64::EPSILON);

        obj.decay_temperature(15);
        assert!((obj.hotness() - 0.4).abs() < 1e-12);

        // decay is applied before the access time moves
        obj.record_read(100, &mut rng);
        assert!((obj.hotness() - 0.3).abs() < 1e-12);
        assert_eq!(obj.last_access(), 100);

        obj.set_hotness(0.05);
        obj.decay_temperature(200);
        assert!(obj.hotness().abs() < f64::EPSILON);
    }

    #[test]
    fn test_temperature_untouched_object() {
        let obj = DataObject::new("a", 10);
        // no accesses: both curves sit at 0.5
        assert!((obj.temperature() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_small_object_follows_intensity() {
        let mut rng = never_hot();
        let mut obj = DataObject::new("a", 10);
        obj.record_read(0, &mut rng);
        // 5 * 0.01 * 1 = 0.05, logistic(0.05) < 0.8
        let expected = 0.05_f64.exp() / (1.0 + 0.05_f64.exp());
        assert!((obj.temperature() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_large_object_follows_access_curve() {
        let mut rng = never_hot();
        let mut obj = DataObject::new("a", 1000);
        for ts in 0..10 {
            obj.record_read(ts, &mut rng);
        }
        let expected = 1.0 - 0.5 / 0.1_f64.exp();
        assert!((obj.temperature() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_saturates() {
        let mut rng = never_hot();
        let mut obj = DataObject::new("a", 1_000_000);
        let mut previous = 0.0;
        for ts in 0..2000 {
            obj.record_write(ts, &mut rng);
            let t = obj.temperature();
            assert!(t <= 1.0);
            assert!(t >= previous);
            previous = t;
        }
        assert!(previous > 0.99);

        // exponent beyond the overflow guard
        obj.reads = 80_000;
        assert!((obj.temperature() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_hotness_clamps() {
        let mut obj = DataObject::new("a", 1);
        obj.set_hotness(3.0);
        assert!((obj.hotness() - 1.0).abs() < f64::EPSILON);
        obj.set_hotness(-1.0);
        assert!(obj.hotness().abs() < f64::EPSILON);
    }
}
