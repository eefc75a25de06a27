//! Runs episodes and pushes gradient updates into the parameter store.
mod base;
mod stat;
pub use base::{discounted_returns, sample_action, Worker, WorkerEnv};
pub use stat::{worker_stats_fmt, WorkerStat};
