//! Observation preprocessing.
use ndarray::Array1;

/// A pure transform from raw observations to flat frames.
///
/// Observation differencing is applied by the caller on processed frames,
/// not here.
pub trait Preprocess<O> {
    /// Transforms a raw observation into a flat frame.
    fn process(&self, raw: &O) -> Array1<f32>;
}

/// Passes flat observations through unchanged.
#[derive(Clone, Debug, Default)]
pub struct IdentityPreproc;

impl Preprocess<Array1<f32>> for IdentityPreproc {
    fn process(&self, raw: &Array1<f32>) -> Array1<f32> {
        raw.clone()
    }
}
