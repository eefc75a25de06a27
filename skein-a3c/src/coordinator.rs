//! Starts, supervises and joins the threads of a training run.
mod base;
mod config;
pub use base::{Coordinator, TrainStats};
pub use config::A3cConfig;
