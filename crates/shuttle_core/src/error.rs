use std::fmt;

use thiserror::Error;

use crate::JobId;

/// Closed set of per-job failure classes. None of them stop the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The key could not be turned into a path-like reference.
    Input,
    /// The copy-object request did not apply.
    RemoteCopy,
    /// The HTTP GET failed or answered with a non-success status.
    Fetch,
    /// The destination upload could not be opened.
    UploadOpen,
    /// Writing to or finalizing an opened upload failed.
    Upload,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Input => write!(f, "input error"),
            FailureKind::RemoteCopy => write!(f, "remote copy error"),
            FailureKind::Fetch => write!(f, "fetch error"),
            FailureKind::UploadOpen => write!(f, "upload open error"),
            FailureKind::Upload => write!(f, "upload error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("(id {job_id}) - [{key}] - {kind}: {message}")]
pub struct JobError {
    pub job_id: JobId,
    pub key: String,
    pub kind: FailureKind,
    pub message: String,
}

impl JobError {
    pub fn new(
        job_id: JobId,
        key: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            key: key.into(),
            kind,
            message: message.into(),
        }
    }
}
