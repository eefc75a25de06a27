//! Periodic rendering of a subset of live environments.
use log::info;
use skein_core::Env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Renders shared environments at a fixed rate until stopped.
///
/// The environments are the ones workers share with this thread; each
/// render takes the lock only briefly.
pub struct Renderer<E: Env> {
    envs: Vec<Arc<Mutex<E>>>,
    period: Duration,
    stop: Arc<Mutex<bool>>,
}

impl<E: Env> Renderer<E> {
    /// Creates a renderer polling at `rate_hz`.
    pub fn new(envs: Vec<Arc<Mutex<E>>>, rate_hz: f32, stop: Arc<Mutex<bool>>) -> Self {
        Self {
            envs,
            period: Duration::from_secs_f32(1.0 / rate_hz.max(f32::MIN_POSITIVE)),
            stop,
        }
    }

    /// Runs the render loop until the stop flag is raised.
    pub fn run(self) {
        loop {
            if *self.stop.lock().unwrap() {
                break;
            }
            for env in &self.envs {
                env.lock().unwrap().render();
            }
            std::thread::sleep(self.period);
        }
        info!("Stopped render thread");
    }
}

#[cfg(test)]
mod tests {
    use super::Renderer;
    use anyhow::Result;
    use ndarray::{arr1, Array1};
    use skein_core::{Env, Step};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct CountingEnv {
        renders: Arc<AtomicUsize>,
        shape: Vec<usize>,
    }

    impl Env for CountingEnv {
        type Config = Arc<AtomicUsize>;
        type Obs = Array1<f32>;
        type Info = ();

        fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
            Ok(Self {
                renders: config.clone(),
                shape: vec![1],
            })
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            Ok(arr1(&[0.0]))
        }

        fn step(&mut self, _action: usize) -> Result<Step<Self::Obs, Self::Info>> {
            Ok(Step {
                obs: arr1(&[0.0]),
                reward: 0.0,
                terminal: true,
                info: (),
            })
        }

        fn n_actions(&self) -> usize {
            1
        }

        fn obs_shape(&self) -> &[usize] {
            &self.shape
        }

        fn render(&mut self) {
            self.renders.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn renders_until_stopped() {
        let renders = Arc::new(AtomicUsize::new(0));
        let env = Arc::new(Mutex::new(CountingEnv::build(&renders, 0).unwrap()));
        let stop = Arc::new(Mutex::new(false));

        let renderer = Renderer::new(vec![env], 200.0, stop.clone());
        let handle = std::thread::spawn(move || renderer.run());
        std::thread::sleep(Duration::from_millis(50));
        *stop.lock().unwrap() = true;
        handle.join().unwrap();

        assert!(renders.load(Ordering::SeqCst) >= 1);
    }
}
