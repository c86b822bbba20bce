use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::JobError;

pub type JobId = u64;

/// One object key to process. Built once by the job source, consumed by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    /// Base URL of the HTTP origin, for relay jobs.
    pub origin: Option<String>,
    pub bucket: String,
    pub key: String,
}

impl Job {
    pub fn new(id: JobId, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id,
            origin: None,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Metadata copy. `content_type` is empty when the copy did not apply.
    Copied {
        content_type: String,
        last_modified: Option<DateTime<Utc>>,
    },
    /// Streaming relay. `status` is 0 when the origin never answered.
    Relayed { bytes: u64, status: u16, url: String },
}

impl Outcome {
    pub fn copy_failed() -> Self {
        Outcome::Copied {
            content_type: String::new(),
            last_modified: None,
        }
    }
}

/// The record produced for every dequeued job, whether or not the operation succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job: Job,
    pub outcome: Outcome,
    pub error: Option<JobError>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Copied {
                content_type,
                last_modified,
            } => {
                write!(
                    f,
                    "(id {}) - [{}] - ContentType: {}",
                    self.job.id, self.job.key, content_type
                )?;
                if let Some(ts) = last_modified {
                    write!(
                        f,
                        " - LastModified: {}",
                        ts.to_rfc3339_opts(SecondsFormat::Secs, true)
                    )?;
                }
            }
            Outcome::Relayed { bytes, status, url } => {
                write!(
                    f,
                    "(id {}) - code: {} bytes: {} - [{}]",
                    self.job.id, status, bytes, url
                )?;
            }
        }
        if let Some(err) = &self.error {
            write!(f, " - FAILED ({})", err.kind)?;
        }
        Ok(())
    }
}
