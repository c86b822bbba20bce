use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub bucket: String,
    pub key: String,
    /// `bucket` followed by the escaped key.
    pub copy_source: String,
    /// Empty means "let the store pick its default".
    pub content_type: String,
    pub replace_metadata: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOutput {
    pub last_modified: Option<DateTime<Utc>>,
}

/// Copy-object and upload-writer capabilities of an object store.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn copy_object(&self, request: CopyRequest) -> Result<CopyOutput, StoreError>;

    async fn open_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn UploadWriter>, StoreError>;
}

/// Write sink for one object. Nothing is visible in the store until `close` succeeds.
#[async_trait::async_trait]
pub trait UploadWriter: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError>;

    /// Finalize the upload. Called exactly once, on every exit path of a relay.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
