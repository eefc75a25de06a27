use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Coordinator`](crate::Coordinator) and its workers.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct A3cConfig {
    /// Experiment identifier, used to tag checkpoints.
    pub experiment: String,

    /// Number of actor-learner threads.
    pub n_workers: usize,

    /// Depth of the observation frame stack.
    pub n_frames: usize,

    /// Learning rate of the gradient step applied by the store.
    pub learning_rate: f32,

    /// Discount factor gamma.
    pub discount: f32,

    /// Step ceiling per episode.
    pub max_episode_steps: usize,

    /// Process-wide environment step budget.
    pub t_max: u64,

    /// Episodes between checkpoints written by worker 0.
    pub checkpoint_interval: usize,

    /// Directory for checkpoints. `None` disables checkpointing.
    pub checkpoint_dir: Option<String>,

    /// Episodes between reports to the presentation sink.
    pub stats_rate: usize,

    /// Capacity of each rolling stat window.
    pub stats_window: usize,

    /// Timeout of the aggregator's queue poll, in milliseconds.
    pub stat_poll_timeout_ms: u64,

    /// Whether window snapshots are forwarded to the sink.
    pub enable_reports: bool,

    /// Whether the render thread runs.
    pub render: bool,

    /// Render rate in Hz.
    pub render_rate_hz: f32,

    /// Number of environments shared with the render thread.
    pub render_n: usize,

    /// Difference processed observations against the previous frame.
    pub difference_obs: bool,

    /// Raise the shared stop flag when a worker fails.
    pub abort_on_failure: bool,
}

impl A3cConfig {
    /// Constructs [`A3cConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`A3cConfig`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the experiment identifier.
    pub fn experiment<T: Into<String>>(mut self, experiment: T) -> Self {
        self.experiment = experiment.into();
        self
    }

    /// Sets the checkpoint directory.
    pub fn checkpoint_dir<T: Into<String>>(mut self, dir: T) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }
}

impl Default for A3cConfig {
    fn default() -> Self {
        Self {
            experiment: "default".to_string(),
            n_workers: 16,
            n_frames: 1,
            learning_rate: 1e-4,
            discount: 0.99,
            max_episode_steps: 1000,
            t_max: 80_000_000,
            checkpoint_interval: 10,
            checkpoint_dir: None,
            stats_rate: 10,
            stats_window: 100,
            stat_poll_timeout_ms: 1000,
            enable_reports: false,
            render: false,
            render_rate_hz: 5.0,
            render_n: 2,
            difference_obs: true,
            abort_on_failure: false,
        }
    }
}
