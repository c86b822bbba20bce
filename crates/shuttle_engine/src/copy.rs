use std::sync::Arc;

use shuttle_core::{content_type_for, escape_key, FailureKind, Job, JobError, Outcome};

use crate::operation::{Attempt, Operation};
use crate::store::{CopyRequest, ObjectStore};

/// Same-object copy that replaces the metadata with a freshly derived content type.
pub struct MetadataCopy {
    store: Arc<dyn ObjectStore>,
}

impl MetadataCopy {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Operation for MetadataCopy {
    async fn execute(&self, job: &Job) -> Attempt {
        let escaped = match escape_key(&job.key) {
            Ok(escaped) => escaped,
            Err(err) => {
                return Attempt::failed(
                    Outcome::copy_failed(),
                    JobError::new(job.id, &job.key, FailureKind::Input, err.to_string()),
                );
            }
        };
        let content_type = content_type_for(&job.key);

        let request = CopyRequest {
            bucket: job.bucket.clone(),
            key: job.key.clone(),
            copy_source: format!("{}{}", job.bucket, escaped),
            content_type: content_type.to_string(),
            replace_metadata: true,
        };

        match self.store.copy_object(request).await {
            Ok(output) => Attempt::succeeded(Outcome::Copied {
                content_type: content_type.to_string(),
                last_modified: output.last_modified,
            }),
            Err(err) => Attempt::failed(
                Outcome::copy_failed(),
                JobError::new(job.id, &job.key, FailureKind::RemoteCopy, err.to_string()),
            ),
        }
    }
}
