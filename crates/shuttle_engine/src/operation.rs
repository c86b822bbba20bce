use shuttle_core::{Job, JobError, Outcome};

/// What one execution of an operation produced. A failed attempt still carries
/// whatever outcome fields it managed to observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub outcome: Outcome,
    pub error: Option<JobError>,
}

impl Attempt {
    pub fn succeeded(outcome: Outcome) -> Self {
        Self {
            outcome,
            error: None,
        }
    }

    pub fn failed(outcome: Outcome, error: JobError) -> Self {
        Self {
            outcome,
            error: Some(error),
        }
    }
}

/// Per-job work executed by the pool. Implementations must not panic on remote
/// failures; they report them through [`Attempt::error`].
#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    async fn execute(&self, job: &Job) -> Attempt;
}
