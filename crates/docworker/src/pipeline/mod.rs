//! Per-message processing: parse, extract, dedup, persist, notify.

pub mod batch;
pub mod error;
pub mod message;
pub mod outcome;
pub mod runner;

pub use batch::{BatchNotifier, BatchStatus};
pub use error::{MessageError, PipelineError};
pub use message::{peek_ids, JobIds, JobMessage};
pub use outcome::HandleOutcome;
pub use runner::Pipeline;
