//! Records of training metrics handed to a presentation sink.
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
