//! Drains per-episode stat records into rolling windows.
mod base;
mod window;
pub use base::StatsAggregator;
pub use window::StatWindow;
