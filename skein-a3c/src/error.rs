use skein_core::error::CoreError;
use thiserror::Error;

/// Errors in asynchronous training.
#[derive(Debug, Error)]
pub enum A3cError {
    /// An update was submitted to a parameter store that was shut down.
    #[error("parameter store is stopped")]
    StoreStopped,

    /// Shape validation failed in the parameter store.
    #[error(transparent)]
    Shape(#[from] CoreError),
}
