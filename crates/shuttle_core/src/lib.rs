//! Shuttle core: job and result model plus the pure helpers that shape a key.
mod content_type;
mod error;
mod job;
mod key;

pub use content_type::content_type_for;
pub use error::{FailureKind, JobError};
pub use job::{Job, JobId, JobResult, Outcome};
pub use key::{escape_key, sanitize_line, KeyError};
