use crate::{
    worker_stats_fmt, A3cConfig, ParamStore, Renderer, StatsAggregator, Worker, WorkerEnv,
    WorkerStat,
};
use anyhow::Result;
use crossbeam_channel::unbounded;
use log::{error, info};
use skein_core::{
    record::{NullRecorder, Recorder},
    ActorCritic, Env, Preprocess,
};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Summary of a training run.
pub struct TrainStats {
    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Total environment steps taken.
    pub env_steps: u64,

    /// Total gradient updates applied by the store.
    pub applied_updates: u64,

    /// Environment steps per second.
    pub steps_per_sec: f32,

    /// Per-worker loop stats.
    pub workers: Vec<WorkerStat>,
}

impl TrainStats {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "steps, updates, steps/sec, duration\n".to_string();
        s += format!(
            "{}, {}, {}, {}\n",
            self.env_steps,
            self.applied_updates,
            self.steps_per_sec,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}

/// Starts and joins the threads of one training run.
///
/// Lifecycle: build the store and the environment collection, spawn N
/// worker threads plus the stats thread (and optionally the render
/// thread), join the workers, then shut the secondary threads down. The
/// stat queue disconnects once every worker is joined, so the aggregator
/// drains it completely before exiting.
pub struct Coordinator<E, M, P>
where
    E: Env,
    M: ActorCritic,
    P: Preprocess<E::Obs>,
{
    config: A3cConfig,
    env_config: E::Config,
    model_config: M::Config,
    preproc: P,
    phantom: PhantomData<(E, M)>,
}

impl<E, M, P> Coordinator<E, M, P>
where
    E: Env + Send + 'static,
    M: ActorCritic + 'static,
    P: Preprocess<E::Obs> + Clone + Send + 'static,
    E::Config: Send + 'static,
    M::Config: Send + 'static,
{
    /// Builds a [`Coordinator`].
    pub fn build(
        config: A3cConfig,
        env_config: E::Config,
        model_config: M::Config,
        preproc: P,
    ) -> Self {
        Self {
            config,
            env_config,
            model_config,
            preproc,
            phantom: PhantomData,
        }
    }

    /// Runs a full training session, blocking until the step budget is
    /// exhausted, and returns run statistics.
    ///
    /// `recorder` receives the periodic stat-window snapshots; it is
    /// replaced by a [`NullRecorder`] when reporting is disabled.
    pub fn train<R>(&mut self, recorder: R) -> Result<TrainStats>
    where
        R: Recorder + Send + 'static,
    {
        let start = SystemTime::now();
        let store = Arc::new(ParamStore::new(self.config.learning_rate));
        let stop = Arc::new(Mutex::new(false));
        let (stat_tx, stat_rx) = unbounded();

        // Materialize the environment collection up front so build
        // failures surface before any thread starts. The first `render_n`
        // environments are shared with the render thread.
        let mut envs: Vec<WorkerEnv<E>> = Vec::with_capacity(self.config.n_workers);
        let mut shared = Vec::new();
        for id in 0..self.config.n_workers {
            let env = E::build(&self.env_config, id as i64)?;
            if self.config.render && id < self.config.render_n {
                let env = Arc::new(Mutex::new(env));
                shared.push(env.clone());
                envs.push(WorkerEnv::Shared(env));
            } else {
                envs.push(WorkerEnv::Owned(env));
            }
        }

        // Worker threads.
        let mut workers = vec![];
        let mut stat_slots = vec![];
        let abort_on_failure = self.config.abort_on_failure;
        for (id, env) in envs.into_iter().enumerate() {
            let model_config = self.model_config.clone();
            let preproc = self.preproc.clone();
            let config = self.config.clone();
            let store = store.clone();
            let stat_tx = stat_tx.clone();
            let stop = stop.clone();
            let slot = Arc::new(Mutex::new(None));
            stat_slots.push(slot.clone());

            let handle = std::thread::spawn(move || {
                match Worker::<E, M, P>::build(
                    id,
                    env,
                    &model_config,
                    preproc,
                    config,
                    store,
                    stat_tx,
                    stop.clone(),
                    slot,
                ) {
                    Ok(mut worker) => worker.run(),
                    Err(e) => {
                        error!("worker {} failed to build: {}", id, e);
                        if abort_on_failure {
                            *stop.lock().unwrap() = true;
                        }
                    }
                }
            });
            workers.push(handle);
        }
        // Only worker threads hold senders now; the queue disconnects
        // when the last worker exits.
        drop(stat_tx);
        info!("Started {} worker threads", workers.len());

        // Stats thread.
        let sink: Box<dyn Recorder + Send> = if self.config.enable_reports {
            Box::new(recorder)
        } else {
            Box::new(NullRecorder {})
        };
        let aggregator = StatsAggregator::new(
            stat_rx,
            sink,
            self.config.stats_window,
            self.config.stats_rate,
            Duration::from_millis(self.config.stat_poll_timeout_ms),
            stop.clone(),
        );
        let stats_handle = std::thread::spawn(move || {
            aggregator.run();
        });

        // Render thread.
        let render_handle = if self.config.render && !shared.is_empty() {
            let renderer = Renderer::new(shared, self.config.render_rate_hz, stop.clone());
            Some(std::thread::spawn(move || renderer.run()))
        } else {
            None
        };

        // Join workers first; the aggregator then drains the
        // disconnected queue and exits without losing records.
        for (id, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!("worker {} panicked", id);
            }
        }
        if stats_handle.join().is_err() {
            error!("stats thread panicked");
        }
        *stop.lock().unwrap() = true;
        if let Some(handle) = render_handle {
            if handle.join().is_err() {
                error!("render thread panicked");
            }
        }
        store.stop();

        let duration = start.elapsed().unwrap_or_default();
        let env_steps = store.global_step();
        let workers: Vec<WorkerStat> = stat_slots
            .iter()
            .filter_map(|slot| slot.lock().unwrap().clone())
            .collect();
        info!("Stats of workers");
        info!("{}", worker_stats_fmt(&workers));

        Ok(TrainStats {
            duration,
            env_steps,
            applied_updates: store.applied_updates(),
            steps_per_sec: env_steps as f32 / duration.as_secs_f32().max(f32::MIN_POSITIVE),
            workers,
        })
    }
}
