//! Messages that workers push onto the stat queue.

/// Per-episode metrics, produced once by a worker and consumed once by
/// the stats aggregator.
#[derive(Clone, Debug)]
pub struct StatRecord {
    /// Id of the reporting worker.
    pub worker_id: usize,

    /// Episode index, local to the worker.
    pub episode: usize,

    /// Total reward of the episode.
    pub reward: f32,

    /// Number of environment steps in the episode.
    pub steps: usize,

    /// Largest value estimate observed during the episode.
    pub value_max: f32,

    /// Smallest value estimate observed during the episode.
    pub value_min: f32,

    /// Mean training loss over the episode.
    pub loss: f32,
}
