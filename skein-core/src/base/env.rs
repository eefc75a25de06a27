//! Environment.
use anyhow::Result;

/// Additional information attached to a [`Step`].
pub trait Info {}

impl Info for () {}

/// Observation, reward and termination tuple emitted at every
/// interaction step.
pub struct Step<O, I: Info> {
    /// Observation after the action was applied.
    pub obs: O,

    /// Reward for the step.
    pub reward: f32,

    /// Flag denoting if the episode is terminated.
    pub terminal: bool,

    /// Information defined by the environment.
    pub info: I,
}

/// Represents an environment, typically an MDP with a discrete action set.
///
/// Each worker thread owns its own instance, built from a shared
/// [`Config`](Env::Config).
pub trait Env {
    /// Configuration, cloned into worker threads to build per-thread
    /// instances.
    type Config: Clone;

    /// Raw observation of the environment.
    type Obs;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Applies the action with the given index.
    fn step(&mut self, action: usize) -> Result<Step<Self::Obs, Self::Info>>;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Shape of raw observations.
    fn obs_shape(&self) -> &[usize];

    /// Renders the current state. The default implementation does nothing.
    fn render(&mut self) {}
}
