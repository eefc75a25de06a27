//! Actor-critic model capability.
use crate::{GradientBatch, WeightSet};
use anyhow::Result;
use ndarray::Array1;
use std::path::Path;

/// Output of a forward pass.
pub struct Inference {
    /// Probabilities over actions. May carry floating-point drift; callers
    /// renormalize before sampling.
    pub probs: Array1<f32>,

    /// Value estimate of the state.
    pub value: f32,
}

/// A policy/value network pair with gradient computation over a weight set.
///
/// Implementations own the numeric forward/backward math. The training
/// loop only moves [`WeightSet`]s and [`GradientBatch`]es between a local
/// replica and the global parameter store.
pub trait ActorCritic {
    /// Configuration, cloned into worker threads to build local replicas.
    type Config: Clone;

    /// Builds a model replica.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Forward pass on a state.
    fn infer(&self, state: &Array1<f32>) -> Result<Inference>;

    /// Gradients of the policy and value losses for a single timestep,
    /// along with the policy loss.
    ///
    /// `action` is the one-hot encoding of the taken action and `target`
    /// the discounted return of the state.
    fn grads(
        &self,
        state: &Array1<f32>,
        action: &Array1<f32>,
        target: f32,
    ) -> Result<(GradientBatch, f32)>;

    /// Returns a copy of the replica's weights.
    fn get_weights(&self) -> WeightSet;

    /// Overwrites the replica's weights.
    fn set_weights(&mut self, weights: &WeightSet) -> Result<()>;

    /// Persists the replica's parameters, tagged with the global step
    /// count. The byte format is owned by the implementation.
    fn save_params(&self, path: &Path, global_step: u64) -> Result<()>;
}
