use std::time::Duration;

/// Stats of the episode loop in each [`Worker`](crate::Worker).
#[derive(Clone, Debug)]
pub struct WorkerStat {
    /// The number of environment steps taken by the worker.
    pub env_steps: u64,

    /// The number of completed episodes.
    pub episodes: usize,

    /// Duration of the episode loop.
    pub duration: Duration,
}

/// Returns a formatted string of the set of [`WorkerStat`]s for reporting.
pub fn worker_stats_fmt(stats: &[WorkerStat]) -> String {
    let mut s = "worker id, steps, episodes, duration [sec], steps per sec\n".to_string();
    for (i, stat) in stats.iter().enumerate() {
        let n = stat.env_steps;
        let d = stat.duration.as_secs_f32();
        let p = (n as f32) / d;
        s += format!("{}, {}, {}, {}, {}\n", i, n, stat.episodes, d, p).as_str();
    }
    s
}
