//! The canonical weight set shared by all workers.
use crate::A3cError;
use log::{info, warn};
use skein_core::{GradientBatch, WeightSet};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex,
};

/// State behind the store's critical section.
#[derive(Default)]
struct Canonical {
    weights: Option<WeightSet>,
    applied_updates: u64,
}

/// Owns the canonical [`WeightSet`] and applies gradient updates to it.
///
/// The store never hands out a mutable reference to the canonical
/// weights: readers take snapshots via [`snapshot`](Self::snapshot) and
/// writers go through [`update`](Self::update), whose numeric step runs
/// inside a narrow critical section. Readers therefore never observe a
/// partially applied update, and concurrent updates are equivalent to
/// the serial order in which they acquired the lock.
///
/// The store owns the optimizer contract: submitted gradients are applied
/// transactionally as a plain gradient step scaled by the learning rate.
pub struct ParamStore {
    canonical: Mutex<Canonical>,
    learning_rate: f32,
    global_step: AtomicU64,
    stopped: AtomicBool,
}

impl ParamStore {
    /// Creates an empty store. Snapshots are `None` until the first
    /// update arrives.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            canonical: Mutex::new(Canonical::default()),
            learning_rate,
            global_step: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the canonical weights, or `None` before the
    /// first update. Blocks only for the duration of the copy.
    pub fn snapshot(&self) -> Option<WeightSet> {
        self.canonical.lock().unwrap().weights.clone()
    }

    /// Applies one gradient step to the canonical weights.
    ///
    /// The first successful update seeds the canonical set from
    /// `weights_used`, the snapshot the submitting worker trained
    /// against. Later updates apply to the canonical set even when
    /// `weights_used` is stale.
    ///
    /// A shape mismatch rejects the update and leaves the canonical
    /// weights unchanged; a stopped store rejects every update.
    pub fn update(
        &self,
        weights_used: &WeightSet,
        grads: &GradientBatch,
    ) -> Result<(), A3cError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(A3cError::StoreStopped);
        }
        let mut canonical = self.canonical.lock().unwrap();
        if canonical.weights.is_none() {
            if let Err(e) = weights_used.check_shapes(grads) {
                warn!("update dropped: {}", e);
                return Err(e.into());
            }
            canonical.weights = Some(weights_used.clone());
        }
        let weights = canonical.weights.as_mut().unwrap();
        if let Err(e) = weights.apply(grads, self.learning_rate) {
            warn!("update dropped: {}", e);
            return Err(e.into());
        }
        canonical.applied_updates += 1;
        Ok(())
    }

    /// The number of successfully applied updates.
    pub fn applied_updates(&self) -> u64 {
        self.canonical.lock().unwrap().applied_updates
    }

    /// Adds environment steps to the global counter and returns the new
    /// total.
    pub fn add_steps(&self, n: u64) -> u64 {
        self.global_step.fetch_add(n, Ordering::SeqCst) + n
    }

    /// The process-wide environment step count.
    pub fn global_step(&self) -> u64 {
        self.global_step.load(Ordering::SeqCst)
    }

    /// Rejects further updates. Snapshots remain available.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        info!("Stopped parameter store");
    }
}
