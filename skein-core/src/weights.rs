//! Weight sets and gradient batches exchanged with the parameter store.
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter arrays keyed by identifier.
pub type ParamMap = BTreeMap<String, Vec<f32>>;

/// Policy and value network parameters.
///
/// The canonical instance is owned by the parameter store; workers only
/// ever hold snapshots of it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    /// Policy network parameters.
    pub policy: ParamMap,

    /// Value network parameters.
    pub value: ParamMap,
}

impl WeightSet {
    /// Verifies that `grads` covers exactly the parameters of this weight
    /// set, with matching array lengths.
    pub fn check_shapes(&self, grads: &GradientBatch) -> Result<(), CoreError> {
        check_half(&self.policy, &grads.policy)?;
        check_half(&self.value, &grads.value)
    }

    /// Applies one optimizer step, `w -= scale * g` elementwise.
    ///
    /// Shapes are validated before any element is touched, so a failed
    /// update leaves the weights unchanged.
    pub fn apply(&mut self, grads: &GradientBatch, scale: f32) -> Result<(), CoreError> {
        self.check_shapes(grads)?;
        apply_half(&mut self.policy, &grads.policy, scale);
        apply_half(&mut self.value, &grads.value, scale);
        Ok(())
    }

    /// Total number of scalar parameters.
    pub fn len(&self) -> usize {
        self.policy.values().chain(self.value.values()).map(Vec::len).sum()
    }

    /// Returns `true` if the set holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.policy.is_empty() && self.value.is_empty()
    }
}

fn check_half(params: &ParamMap, grads: &ParamMap) -> Result<(), CoreError> {
    for (name, g) in grads {
        let w = params
            .get(name)
            .ok_or_else(|| CoreError::UnknownParam(name.clone()))?;
        if w.len() != g.len() {
            return Err(CoreError::ShapeMismatch {
                param: name.clone(),
                expected: w.len(),
                actual: g.len(),
            });
        }
    }
    if let Some(name) = params.keys().find(|name| !grads.contains_key(*name)) {
        return Err(CoreError::MissingGradient(name.clone()));
    }
    Ok(())
}

fn apply_half(params: &mut ParamMap, grads: &ParamMap, scale: f32) {
    for (name, g) in grads {
        if let Some(w) = params.get_mut(name) {
            for (w_i, g_i) in w.iter_mut().zip(g) {
                *w_i -= scale * g_i;
            }
        }
    }
}

/// Accumulated elementwise sums of per-timestep policy and value
/// gradients for one episode.
///
/// Transient: consumed by a single store update call.
#[derive(Clone, Debug, Default)]
pub struct GradientBatch {
    /// Gradients for the policy parameters.
    pub policy: ParamMap,

    /// Gradients for the value parameters.
    pub value: ParamMap,
}

impl GradientBatch {
    /// Adds another batch into this one elementwise.
    ///
    /// Parameters absent from this batch adopt the arrays of `other`.
    pub fn accumulate(&mut self, other: &GradientBatch) -> Result<(), CoreError> {
        accumulate_half(&mut self.policy, &other.policy)?;
        accumulate_half(&mut self.value, &other.value)
    }

    /// Returns `true` when every element is finite.
    pub fn is_finite(&self) -> bool {
        self.policy
            .values()
            .chain(self.value.values())
            .flatten()
            .all(|g| g.is_finite())
    }

    /// Returns `true` when the batch holds no gradients.
    pub fn is_empty(&self) -> bool {
        self.policy.is_empty() && self.value.is_empty()
    }
}

fn accumulate_half(dst: &mut ParamMap, src: &ParamMap) -> Result<(), CoreError> {
    for (name, g) in src {
        match dst.get_mut(name) {
            None => {
                dst.insert(name.clone(), g.clone());
            }
            Some(acc) => {
                if acc.len() != g.len() {
                    return Err(CoreError::ShapeMismatch {
                        param: name.clone(),
                        expected: acc.len(),
                        actual: g.len(),
                    });
                }
                for (a, b) in acc.iter_mut().zip(g) {
                    *a += b;
                }
            }
        }
    }
    Ok(())
}
