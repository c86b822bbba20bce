#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use shuttle_core::JobResult;
use shuttle_engine::{
    CopyOutput, CopyRequest, FetchError, FetchResponse, HttpGet, ObjectStore, ResultSink,
    StoreError, UploadWriter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedUpload {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub largest_chunk: usize,
}

/// In-memory store recording every copy and every closed upload.
#[derive(Default)]
pub struct MemoryStore {
    pub copies: Mutex<Vec<CopyRequest>>,
    pub uploads: Arc<Mutex<Vec<FinishedUpload>>>,
    pub opened: AtomicU64,
    pub fail_copy_key: Option<String>,
    pub fail_open: bool,
    /// Writes fail once this many bytes have been accepted.
    pub fail_write_after: Option<usize>,
}

impl MemoryStore {
    pub fn copies(&self) -> Vec<CopyRequest> {
        self.copies.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<FinishedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn copy_object(&self, request: CopyRequest) -> Result<CopyOutput, StoreError> {
        let failing = self.fail_copy_key.as_deref() == Some(request.key.as_str());
        self.copies.lock().unwrap().push(request);
        if failing {
            return Err(StoreError::Service {
                code: "NoSuchKey".into(),
                message: "The specified key does not exist.".into(),
            });
        }
        Ok(CopyOutput::default())
    }

    async fn open_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn UploadWriter>, StoreError> {
        if self.fail_open {
            return Err(StoreError::Service {
                code: "AccessDenied".into(),
                message: "Access Denied".into(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryUpload {
            finished: FinishedUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
                data: Vec::new(),
                largest_chunk: 0,
            },
            sink: self.uploads.clone(),
            fail_write_after: self.fail_write_after,
        }))
    }
}

struct MemoryUpload {
    finished: FinishedUpload,
    sink: Arc<Mutex<Vec<FinishedUpload>>>,
    fail_write_after: Option<usize>,
}

#[async_trait::async_trait]
impl UploadWriter for MemoryUpload {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        if let Some(limit) = self.fail_write_after {
            if self.finished.data.len() >= limit {
                return Err(StoreError::Request("connection reset".into()));
            }
        }
        self.finished.largest_chunk = self.finished.largest_chunk.max(chunk.len());
        self.finished.data.extend_from_slice(&chunk);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.sink.lock().unwrap().push(self.finished);
        Ok(())
    }
}

/// Store whose uploads only count bytes and track how far the producer runs ahead.
pub struct CountingStore {
    pub produced: Arc<AtomicU64>,
    pub consumed: Arc<AtomicU64>,
    pub max_in_flight: Arc<AtomicU64>,
}

#[async_trait::async_trait]
impl ObjectStore for CountingStore {
    async fn copy_object(&self, _request: CopyRequest) -> Result<CopyOutput, StoreError> {
        Ok(CopyOutput::default())
    }

    async fn open_upload(
        &self,
        _bucket: &str,
        _key: &str,
        _content_type: &str,
    ) -> Result<Box<dyn UploadWriter>, StoreError> {
        Ok(Box::new(CountingUpload {
            produced: self.produced.clone(),
            consumed: self.consumed.clone(),
            max_in_flight: self.max_in_flight.clone(),
        }))
    }
}

struct CountingUpload {
    produced: Arc<AtomicU64>,
    consumed: Arc<AtomicU64>,
    max_in_flight: Arc<AtomicU64>,
}

#[async_trait::async_trait]
impl UploadWriter for CountingUpload {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        let consumed = self.consumed.fetch_add(chunk.len() as u64, Ordering::SeqCst)
            + chunk.len() as u64;
        let in_flight = self.produced.load(Ordering::SeqCst) - consumed;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        // Give the producer every chance to run ahead.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Origin that generates its body lazily, counting every byte it hands out.
pub struct SyntheticOrigin {
    pub total: usize,
    pub chunk: usize,
    pub produced: Arc<AtomicU64>,
}

#[async_trait::async_trait]
impl HttpGet for SyntheticOrigin {
    async fn get(&self, _url: &str) -> Result<FetchResponse, FetchError> {
        let chunk = self.chunk;
        let chunks = self.total.div_ceil(chunk);
        let total = self.total;
        let produced = self.produced.clone();
        let body = stream::iter(0..chunks)
            .map(move |index| {
                let len = chunk.min(total - index * chunk);
                produced.fetch_add(len as u64, Ordering::SeqCst);
                Ok(Bytes::from(vec![b'x'; len]))
            })
            .boxed();
        Ok(FetchResponse { status: 200, body })
    }
}

#[derive(Clone, Default)]
pub struct VecSink {
    pub results: Arc<Mutex<Vec<JobResult>>>,
}

impl VecSink {
    pub fn take(&self) -> Vec<JobResult> {
        self.results.lock().unwrap().drain(..).collect()
    }
}

impl ResultSink for VecSink {
    fn emit(&self, result: &JobResult) {
        self.results.lock().unwrap().push(result.clone());
    }
}
