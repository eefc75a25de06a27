//! Deterministic environments and models. This module is used for tests.
use crate::{ActorCritic, Env, GradientBatch, Inference, ParamMap, Step, WeightSet};
use anyhow::{bail, Result};
use ndarray::{arr1, Array1};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Configuration of [`EpisodicEnv`].
#[derive(Clone, Debug)]
pub struct EpisodicEnvConfig {
    /// Steps until the episode terminates.
    pub episode_len: usize,

    /// Reward granted at every step.
    pub reward: f32,

    /// Number of discrete actions.
    pub n_actions: usize,
}

impl Default for EpisodicEnvConfig {
    fn default() -> Self {
        Self {
            episode_len: 5,
            reward: 1.0,
            n_actions: 2,
        }
    }
}

/// An environment that terminates after a fixed number of steps, with a
/// constant reward and the step index as observation.
pub struct EpisodicEnv {
    config: EpisodicEnvConfig,
    t: usize,
    shape: Vec<usize>,
}

impl Env for EpisodicEnv {
    type Config = EpisodicEnvConfig;
    type Obs = Array1<f32>;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            t: 0,
            shape: vec![1],
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.t = 0;
        Ok(arr1(&[0.0]))
    }

    fn step(&mut self, _action: usize) -> Result<Step<Self::Obs, Self::Info>> {
        self.t += 1;
        Ok(Step {
            obs: arr1(&[self.t as f32]),
            reward: self.config.reward,
            terminal: self.t >= self.config.episode_len,
            info: (),
        })
    }

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn obs_shape(&self) -> &[usize] {
        &self.shape
    }
}

/// Configuration of [`FailingEnv`].
#[derive(Clone, Debug)]
pub struct FailingEnvConfig {
    /// Seed of the instance that fails; other instances behave normally.
    pub fail_seed: i64,

    /// Total step count at which the failing instance starts erroring.
    pub fail_at: usize,

    /// Configuration of the wrapped environment.
    pub inner: EpisodicEnvConfig,
}

/// Wraps [`EpisodicEnv`] so that the instance built with one seed starts
/// failing its `step` calls after a number of steps.
pub struct FailingEnv {
    inner: EpisodicEnv,
    fails: bool,
    fail_at: usize,
    steps: usize,
}

impl Env for FailingEnv {
    type Config = FailingEnvConfig;
    type Obs = Array1<f32>;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            inner: EpisodicEnv::build(&config.inner, seed)?,
            fails: seed == config.fail_seed,
            fail_at: config.fail_at,
            steps: 0,
        })
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.inner.reset()
    }

    fn step(&mut self, action: usize) -> Result<Step<Self::Obs, Self::Info>> {
        self.steps += 1;
        if self.fails && self.steps >= self.fail_at {
            bail!("environment failure at step {}", self.steps);
        }
        self.inner.step(action)
    }

    fn n_actions(&self) -> usize {
        self.inner.n_actions()
    }

    fn obs_shape(&self) -> &[usize] {
        self.inner.obs_shape()
    }
}

/// Configuration of [`ConstModel`].
#[derive(Clone)]
pub struct ConstModelConfig {
    /// Number of discrete actions.
    pub n_actions: usize,

    /// Constant value estimate returned by `infer`.
    pub value: f32,

    /// Length of each parameter array.
    pub dim: usize,

    /// Emit NaN gradients, for exercising the instability screen.
    pub nan_grads: bool,

    /// When set, records the global step of every `save_params` call.
    pub save_log: Option<Arc<Mutex<Vec<u64>>>>,
}

impl Default for ConstModelConfig {
    fn default() -> Self {
        Self {
            n_actions: 2,
            value: 0.0,
            dim: 4,
            nan_grads: false,
            save_log: None,
        }
    }
}

/// A model with constant outputs and deterministic gradients, for
/// exercising the training loop without numeric optimization.
///
/// `infer` returns a deliberately unnormalized uniform distribution so
/// that callers must renormalize before sampling.
pub struct ConstModel {
    config: ConstModelConfig,
    weights: WeightSet,
}

impl ConstModel {
    fn fill(&self, x: f32) -> Vec<f32> {
        vec![x; self.config.dim]
    }
}

impl ActorCritic for ConstModel {
    type Config = ConstModelConfig;

    fn build(config: &Self::Config) -> Result<Self> {
        let mut policy = ParamMap::new();
        policy.insert("pi/w".to_string(), vec![0.0; config.dim]);
        let mut value = ParamMap::new();
        value.insert("v/w".to_string(), vec![0.0; config.dim]);
        Ok(Self {
            config: config.clone(),
            weights: WeightSet { policy, value },
        })
    }

    fn infer(&self, _state: &Array1<f32>) -> Result<Inference> {
        Ok(Inference {
            probs: Array1::from_elem(self.config.n_actions, 1.0),
            value: self.config.value,
        })
    }

    fn grads(
        &self,
        _state: &Array1<f32>,
        _action: &Array1<f32>,
        target: f32,
    ) -> Result<(GradientBatch, f32)> {
        let advantage = target - self.config.value;
        let g = if self.config.nan_grads {
            f32::NAN
        } else {
            -advantage
        };
        let mut batch = GradientBatch::default();
        batch.policy.insert("pi/w".to_string(), self.fill(g));
        batch
            .value
            .insert("v/w".to_string(), self.fill(-2.0 * advantage));
        Ok((batch, advantage * advantage))
    }

    fn get_weights(&self) -> WeightSet {
        self.weights.clone()
    }

    fn set_weights(&mut self, weights: &WeightSet) -> Result<()> {
        self.weights = weights.clone();
        Ok(())
    }

    fn save_params(&self, path: &Path, global_step: u64) -> Result<()> {
        if let Some(log) = &self.config.save_log {
            log.lock().unwrap().push(global_step);
        }
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self.weights)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episodic_env_terminates_at_configured_length() {
        let mut env = EpisodicEnv::build(&EpisodicEnvConfig::default(), 0).unwrap();
        env.reset().unwrap();
        for t in 1..=5 {
            let step = env.step(0).unwrap();
            assert_eq!(step.terminal, t == 5);
            assert_eq!(step.reward, 1.0);
        }
    }

    #[test]
    fn const_model_persists_params_and_logs_the_step() {
        let dir = tempdir::TempDir::new("const_model").unwrap();
        let path = dir.path().join("checkpoint_test.ckpt");
        let log = Arc::new(Mutex::new(Vec::new()));
        let config = ConstModelConfig {
            save_log: Some(log.clone()),
            ..ConstModelConfig::default()
        };

        let model = ConstModel::build(&config).unwrap();
        model.save_params(&path, 42).unwrap();

        assert!(path.exists());
        assert_eq!(*log.lock().unwrap(), vec![42]);
    }

    #[test]
    fn failing_env_fails_only_for_its_seed() {
        let config = FailingEnvConfig {
            fail_seed: 0,
            fail_at: 2,
            inner: EpisodicEnvConfig::default(),
        };
        let mut env = FailingEnv::build(&config, 0).unwrap();
        env.reset().unwrap();
        env.step(0).unwrap();
        assert!(env.step(0).is_err());

        let mut env = FailingEnv::build(&config, 1).unwrap();
        env.reset().unwrap();
        for _ in 0..5 {
            env.step(0).unwrap();
        }
    }
}
