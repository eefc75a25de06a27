//! Asynchronous actor-critic training on threads.
//!
//! N worker threads each drive their own environment instance, collect
//! episode trajectories and accumulate gradients against a local model
//! replica. All workers share one [`ParamStore`], which owns the
//! canonical weight set: workers refresh their replica from a store
//! snapshot before each episode and submit their gradient batch when the
//! episode ends, tolerating the staleness in between. Per-episode
//! [`StatRecord`]s flow over a multi-producer channel into the
//! [`StatsAggregator`], which rolls them into windows for the
//! presentation sink. The [`Coordinator`] starts all threads and joins
//! them on shutdown.
mod coordinator;
mod error;
mod frame_stack;
mod messages;
mod param_store;
mod renderer;
mod stats;
mod worker;
pub use coordinator::{A3cConfig, Coordinator, TrainStats};
pub use error::A3cError;
pub use frame_stack::FrameStack;
pub use messages::StatRecord;
pub use param_store::ParamStore;
pub use renderer::Renderer;
pub use stats::{StatWindow, StatsAggregator};
pub use worker::{discounted_returns, sample_action, worker_stats_fmt, Worker, WorkerEnv, WorkerStat};

#[cfg(test)]
mod test {
    use crate::{A3cConfig, Coordinator, ParamStore, Worker, WorkerEnv};
    use crossbeam_channel::unbounded;
    use skein_core::record::{Record, Recorder};
    use skein_core::testing::{
        ConstModel, ConstModelConfig, EpisodicEnv, EpisodicEnvConfig, FailingEnv,
        FailingEnvConfig,
    };
    use skein_core::{Env as _, IdentityPreproc};
    use std::sync::{Arc, Mutex};
    use tempdir::TempDir;
    use test_log::test;

    /// Collects records across the thread boundary.
    #[derive(Clone, Default)]
    struct SharedRecorder(Arc<Mutex<Vec<Record>>>);

    impl Recorder for SharedRecorder {
        fn write(&mut self, record: Record) {
            self.0.lock().unwrap().push(record);
        }
    }

    fn config() -> A3cConfig {
        A3cConfig {
            experiment: "test".to_string(),
            n_workers: 2,
            n_frames: 2,
            discount: 0.5,
            max_episode_steps: 100,
            t_max: 40,
            checkpoint_interval: 0,
            stats_rate: 1,
            stats_window: 10,
            stat_poll_timeout_ms: 20,
            enable_reports: true,
            ..A3cConfig::default()
        }
    }

    fn build_worker(
        id: usize,
        store: Arc<ParamStore>,
        config: A3cConfig,
        model_config: ConstModelConfig,
    ) -> Worker<EpisodicEnv, ConstModel, IdentityPreproc> {
        let env = EpisodicEnv::build(&EpisodicEnvConfig::default(), id as i64).unwrap();
        // These tests drive `run_episode` directly; no stat consumer.
        let (stat_tx, _) = unbounded();
        Worker::build(
            id,
            WorkerEnv::Owned(env),
            &model_config,
            IdentityPreproc,
            config,
            store,
            stat_tx,
            Arc::new(Mutex::new(false)),
            Arc::new(Mutex::new(None)),
        )
        .unwrap()
    }

    #[test]
    fn two_workers_submit_one_episode_each() {
        let store = Arc::new(ParamStore::new(0.1));

        let handles: Vec<_> = (0..2)
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut worker =
                        build_worker(id, store, config(), ConstModelConfig::default());
                    worker.run_episode().unwrap()
                })
            })
            .collect();

        for handle in handles {
            let record = handle.join().unwrap();
            assert_eq!(record.reward, 5.0);
            assert_eq!(record.steps, 5);
        }
        assert_eq!(store.applied_updates(), 2);
        assert_eq!(store.global_step(), 10);
    }

    #[test]
    fn non_finite_gradients_are_discarded() {
        let store = Arc::new(ParamStore::new(0.1));
        let model_config = ConstModelConfig {
            nan_grads: true,
            ..ConstModelConfig::default()
        };
        let mut worker = build_worker(0, store.clone(), config(), model_config);

        let record = worker.run_episode().unwrap();
        assert_eq!(record.reward, 5.0);
        assert_eq!(store.applied_updates(), 0);
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn worker_zero_writes_checkpoints_on_the_interval() {
        let dir = TempDir::new("skein_ckpt").unwrap();
        let save_log = Arc::new(Mutex::new(Vec::new()));
        let model_config = ConstModelConfig {
            save_log: Some(save_log.clone()),
            ..ConstModelConfig::default()
        };
        let mut config = config();
        config.checkpoint_interval = 10;
        config.checkpoint_dir = Some(dir.path().to_str().unwrap().to_string());

        let store = Arc::new(ParamStore::new(0.1));
        let mut worker = build_worker(0, store.clone(), config.clone(), model_config.clone());
        for _ in 0..25 {
            worker.run_episode().unwrap();
        }
        // Checkpoints at episodes 10 and 20 only.
        assert_eq!(save_log.lock().unwrap().len(), 2);
        assert!(dir.path().join("checkpoint_test.ckpt").exists());

        // Other workers never write checkpoints.
        let other_log = Arc::new(Mutex::new(Vec::new()));
        let model_config = ConstModelConfig {
            save_log: Some(other_log.clone()),
            ..model_config
        };
        let mut worker = build_worker(1, store, config, model_config);
        for _ in 0..25 {
            worker.run_episode().unwrap();
        }
        assert!(other_log.lock().unwrap().is_empty());
    }

    #[test]
    fn coordinator_runs_to_the_step_budget() {
        let recorder = SharedRecorder::default();
        let records = recorder.0.clone();

        let mut coordinator = Coordinator::<EpisodicEnv, ConstModel, IdentityPreproc>::build(
            config(),
            EpisodicEnvConfig::default(),
            ConstModelConfig::default(),
            IdentityPreproc,
        );
        let stats = coordinator.train(recorder).unwrap();

        assert!(stats.env_steps >= 40);
        let episodes: usize = stats.workers.iter().map(|w| w.episodes).sum();
        assert_eq!(stats.applied_updates, episodes as u64);
        assert_eq!(stats.workers.len(), 2);

        let records = records.lock().unwrap();
        assert!(!records.is_empty());
        for record in records.iter() {
            let rewards = record.get_array1("reward").unwrap();
            assert!(rewards.iter().all(|r| *r == 5.0));
            let lens = record.get_array1("episode_len").unwrap();
            assert!(lens.iter().all(|l| *l == 5.0));
        }
    }

    #[test]
    fn env_failure_is_fatal_to_its_worker_only() {
        let env_config = FailingEnvConfig {
            fail_seed: 0,
            fail_at: 7,
            inner: EpisodicEnvConfig::default(),
        };
        let mut config = config();
        config.t_max = 60;

        let mut coordinator = Coordinator::<FailingEnv, ConstModel, IdentityPreproc>::build(
            config,
            env_config,
            ConstModelConfig::default(),
            IdentityPreproc,
        );
        let stats = coordinator.train(SharedRecorder::default()).unwrap();

        // Worker 0 dies during its second episode; worker 1 carries the
        // run to the step budget.
        assert_eq!(stats.workers.len(), 2);
        assert!(stats.env_steps >= 60);
        let min_episodes = stats.workers.iter().map(|w| w.episodes).min().unwrap();
        assert!(min_episodes <= 2);
    }
}
