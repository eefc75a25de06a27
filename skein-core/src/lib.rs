#![warn(missing_docs)]
//! Core abstractions for asynchronous actor-critic training.
//!
//! This crate defines the capability traits implemented by external
//! collaborators (environments, actor-critic models, observation
//! preprocessing), the weight and gradient containers exchanged with the
//! global parameter store, and the record types handed to presentation
//! sinks.
pub mod error;
pub mod record;
pub mod testing;

mod base;
pub use base::{ActorCritic, Env, IdentityPreproc, Inference, Info, Preprocess, Step};

mod weights;
pub use weights::{GradientBatch, ParamMap, WeightSet};
