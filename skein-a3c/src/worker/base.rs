use crate::{A3cConfig, FrameStack, ParamStore, StatRecord, WorkerStat};
use anyhow::Result;
use crossbeam_channel::Sender;
use fastrand::Rng;
use log::{debug, error, info, warn};
use ndarray::Array1;
use skein_core::{ActorCritic, Env, GradientBatch, Preprocess, Step};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// An environment slot, exclusively owned unless shared with the render
/// thread.
pub enum WorkerEnv<E> {
    /// Owned by this worker alone.
    Owned(E),

    /// Shared with the render thread, taken briefly per call.
    Shared(Arc<Mutex<E>>),
}

impl<E: Env> WorkerEnv<E> {
    fn reset(&mut self) -> Result<E::Obs> {
        match self {
            WorkerEnv::Owned(env) => env.reset(),
            WorkerEnv::Shared(env) => env.lock().unwrap().reset(),
        }
    }

    fn step(&mut self, action: usize) -> Result<Step<E::Obs, E::Info>> {
        match self {
            WorkerEnv::Owned(env) => env.step(action),
            WorkerEnv::Shared(env) => env.lock().unwrap().step(action),
        }
    }

    fn n_actions(&self) -> usize {
        match self {
            WorkerEnv::Owned(env) => env.n_actions(),
            WorkerEnv::Shared(env) => env.lock().unwrap().n_actions(),
        }
    }
}

/// One episode of (state, one-hot action, reward) triples.
///
/// Owned by the worker that produced it and discarded once its gradient
/// batch is computed.
struct Trajectory {
    states: Vec<Array1<f32>>,
    actions: Vec<Array1<f32>>,
    rewards: Vec<f32>,
}

impl Trajectory {
    fn new() -> Self {
        Self {
            states: vec![],
            actions: vec![],
            rewards: vec![],
        }
    }

    fn push(&mut self, state: Array1<f32>, action: Array1<f32>, reward: f32) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
    }

    fn len(&self) -> usize {
        self.rewards.len()
    }
}

/// Discounted-return targets for one episode.
///
/// Walks the rewards in reverse with `R = r + gamma * R`, seeded with the
/// bootstrap value, and returns the targets in step order.
pub fn discounted_returns(rewards: &[f32], gamma: f32, bootstrap: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut r = bootstrap;
    for t in (0..rewards.len()).rev() {
        r = rewards[t] + gamma * r;
        returns[t] = r;
    }
    returns
}

/// Samples an action index from a probability vector.
///
/// The vector is renormalized by its sum, absorbing floating-point drift
/// and unnormalized model outputs.
pub fn sample_action(rng: &mut Rng, probs: &Array1<f32>) -> usize {
    let total: f32 = probs.sum();
    let mut u = rng.f32() * total;
    for (i, p) in probs.iter().enumerate() {
        u -= p;
        if u < 0.0 {
            return i;
        }
    }
    probs.len() - 1
}

fn checkpoint_due(worker_id: usize, episodes: usize, interval: usize) -> bool {
    worker_id == 0 && interval > 0 && episodes % interval == 0
}

/// Runs episodes against its own environment and model replica, pushing
/// gradient updates into the shared [`ParamStore`].
pub struct Worker<E, M, P>
where
    E: Env,
    M: ActorCritic,
    P: Preprocess<E::Obs>,
{
    id: usize,
    env: WorkerEnv<E>,
    model: M,
    preproc: P,
    rng: Rng,
    config: A3cConfig,
    store: Arc<ParamStore>,
    stats_tx: Sender<StatRecord>,

    /// Checked at episode boundaries; raised by the coordinator or by a
    /// failing worker when the run is configured to abort.
    stop: Arc<Mutex<bool>>,

    /// Filled with the final [`WorkerStat`] when the loop ends.
    stat_slot: Arc<Mutex<Option<WorkerStat>>>,

    episodes: usize,
    env_steps: u64,
}

impl<E, M, P> Worker<E, M, P>
where
    E: Env,
    M: ActorCritic,
    P: Preprocess<E::Obs>,
{
    /// Builds a worker with a local model replica and an RNG seeded by
    /// the worker id.
    pub fn build(
        id: usize,
        env: WorkerEnv<E>,
        model_config: &M::Config,
        preproc: P,
        config: A3cConfig,
        store: Arc<ParamStore>,
        stats_tx: Sender<StatRecord>,
        stop: Arc<Mutex<bool>>,
        stat_slot: Arc<Mutex<Option<WorkerStat>>>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            env,
            model: M::build(model_config)?,
            preproc,
            rng: Rng::with_seed(id as u64),
            config,
            store,
            stats_tx,
            stop,
            stat_slot,
            episodes: 0,
            env_steps: 0,
        })
    }

    /// Runs one full episode and returns its stat record.
    pub fn run_episode(&mut self) -> Result<StatRecord> {
        let raw = self.env.reset()?;
        let mut prev_frame = self.preproc.process(&raw);
        let mut stack = FrameStack::new(self.config.n_frames, &prev_frame);

        // Refresh the local replica from the store when a snapshot
        // exists; otherwise train on the local weights.
        let weights_used = match self.store.snapshot() {
            Some(weights) => {
                debug!("worker {}: updating local weights from the store", self.id);
                self.model.set_weights(&weights)?;
                weights
            }
            None => self.model.get_weights(),
        };

        let n_actions = self.env.n_actions();
        let mut traj = Trajectory::new();
        let mut reward_sum = 0.0;
        let mut value_max = f32::NEG_INFINITY;
        let mut value_min = f32::INFINITY;
        let mut terminal = false;

        while traj.len() < self.config.max_episode_steps {
            let state = stack.state().clone();
            let inference = self.model.infer(&state)?;
            let action = sample_action(&mut self.rng, &inference.probs);

            let step = self.env.step(action)?;
            let frame = self.preproc.process(&step.obs);
            let frame = if self.config.difference_obs {
                let diffed = &frame - &prev_frame;
                prev_frame = frame;
                diffed
            } else {
                prev_frame = frame.clone();
                frame
            };
            stack.push(&frame);

            let mut onehot = Array1::zeros(n_actions);
            onehot[action] = 1.0;
            traj.push(state, onehot, step.reward);

            reward_sum += step.reward;
            value_max = value_max.max(inference.value);
            value_min = value_min.min(inference.value);
            self.env_steps += 1;
            self.store.add_steps(1);

            if step.terminal {
                terminal = true;
                break;
            }
        }

        // Bootstrap from the value estimate of the final state unless the
        // episode ended on a terminal.
        let bootstrap = if terminal {
            0.0
        } else {
            self.model.infer(stack.state())?.value
        };

        let (grads, losses) = self.accumulate(&traj, bootstrap)?;
        self.episodes += 1;

        if grads.is_finite() {
            if let Err(e) = self.store.update(&weights_used, &grads) {
                debug!("worker {}: update rejected: {}", self.id, e);
            }
        } else {
            warn!(
                "worker {}: non-finite gradients, update discarded",
                self.id
            );
        }

        if checkpoint_due(self.id, self.episodes, self.config.checkpoint_interval) {
            self.save_checkpoint();
        }

        let loss = if losses.is_empty() {
            0.0
        } else {
            losses.iter().sum::<f32>() / losses.len() as f32
        };
        Ok(StatRecord {
            worker_id: self.id,
            episode: self.episodes,
            reward: reward_sum,
            steps: traj.len(),
            value_max,
            value_min,
            loss,
        })
    }

    /// Walks the trajectory in reverse, accumulating per-step policy and
    /// value gradients into a single batch.
    fn accumulate(&self, traj: &Trajectory, bootstrap: f32) -> Result<(GradientBatch, Vec<f32>)> {
        let targets = discounted_returns(&traj.rewards, self.config.discount, bootstrap);
        let mut batch = GradientBatch::default();
        let mut losses = Vec::with_capacity(traj.len());
        for t in (0..traj.len()).rev() {
            let (grads, loss) = self
                .model
                .grads(&traj.states[t], &traj.actions[t], targets[t])?;
            batch.accumulate(&grads)?;
            losses.push(loss);
        }
        Ok((batch, losses))
    }

    /// Writes a checkpoint of the store's current weights through the
    /// model's own persistence. Failures are logged and training goes on.
    fn save_checkpoint(&mut self) {
        let dir = match &self.config.checkpoint_dir {
            Some(dir) => dir.clone(),
            None => return,
        };
        // The checkpoint reflects the store, not this worker's replica.
        if let Some(weights) = self.store.snapshot() {
            if let Err(e) = self.model.set_weights(&weights) {
                warn!("worker {}: checkpoint skipped: {}", self.id, e);
                return;
            }
        }
        let path =
            PathBuf::from(dir).join(format!("checkpoint_{}.ckpt", self.config.experiment));
        let step = self.store.global_step();
        info!("Writing checkpoint: {:?}", path);
        if let Err(e) = self.model.save_params(&path, step) {
            warn!("worker {}: checkpoint failed: {}", self.id, e);
        }
    }

    /// Runs episodes until the process-wide step budget is exhausted or
    /// the stop flag is raised.
    ///
    /// Environment and model failures end this worker's loop only; the
    /// shared stop flag is raised as well when the run is configured to
    /// abort on failure.
    pub fn run(&mut self) {
        let start = SystemTime::now();
        loop {
            if *self.stop.lock().unwrap() || self.store.global_step() >= self.config.t_max {
                break;
            }
            match self.run_episode() {
                Ok(record) => {
                    info!(
                        "WORKER {} / STEP {} / EPISODE {} / REWARD {} / VF ({:.4}, {:.4})",
                        self.id,
                        self.store.global_step(),
                        self.episodes,
                        record.reward,
                        record.value_min,
                        record.value_max,
                    );
                    if self.stats_tx.send(record).is_err() {
                        debug!("worker {}: stat queue closed", self.id);
                    }
                }
                Err(e) => {
                    error!("worker {} stopped: {}", self.id, e);
                    if self.config.abort_on_failure {
                        *self.stop.lock().unwrap() = true;
                    }
                    break;
                }
            }
        }
        let duration = start.elapsed().unwrap_or_default();
        *self.stat_slot.lock().unwrap() = Some(WorkerStat {
            env_steps: self.env_steps,
            episodes: self.episodes,
            duration,
        });
    }
}
