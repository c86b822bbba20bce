//! Streaming relay: an HTTP origin body piped straight into an object-store upload.
//!
//! The GET runs on its own task and writes into the write half of an in-process
//! pipe; the calling task reads the other half and feeds the upload writer. Memory
//! held per relay is bounded by the pipe capacity plus one chunk on each side.
//!
//! Either side can fail without hanging the other. A finished or failed fetch
//! drops its pipe half, which the reader sees as end-of-stream. A missing or
//! failed upload drops the read half, which turns the fetch's next write into a
//! broken-pipe error. The fetch task is joined before the relay returns and is
//! aborted if the relay future itself is dropped.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use shuttle_core::{content_type_for, escape_key, FailureKind, Job, JobError, Outcome};
use shuttle_logging::{shuttle_debug, shuttle_warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::task::AbortOnDropHandle;

use crate::fetch::HttpGet;
use crate::operation::{Attempt, Operation};
use crate::store::{ObjectStore, UploadWriter};
use crate::{FetchError, RelaySettings};

pub struct StreamingRelay {
    store: Arc<dyn ObjectStore>,
    http: Arc<dyn HttpGet>,
    settings: RelaySettings,
}

impl StreamingRelay {
    pub fn new(store: Arc<dyn ObjectStore>, http: Arc<dyn HttpGet>, settings: RelaySettings) -> Self {
        Self {
            store,
            http,
            settings,
        }
    }
}

/// `origin + "/" + prefix + escaped_key`. Keys carry their own leading slash.
pub fn resolve_url(origin: &str, path_prefix: &str, escaped_key: &str) -> String {
    format!("{origin}/{path_prefix}{escaped_key}")
}

#[async_trait::async_trait]
impl Operation for StreamingRelay {
    async fn execute(&self, job: &Job) -> Attempt {
        let input_failure = |message: String, url: String| {
            Attempt::failed(
                Outcome::Relayed {
                    bytes: 0,
                    status: 0,
                    url,
                },
                JobError::new(job.id, &job.key, FailureKind::Input, message),
            )
        };

        let escaped = match escape_key(&job.key) {
            Ok(escaped) => escaped,
            Err(err) => return input_failure(err.to_string(), String::new()),
        };
        let Some(origin) = job.origin.as_deref() else {
            return input_failure("no origin configured".into(), String::new());
        };
        let url = resolve_url(origin, &self.settings.path_prefix, &escaped);
        let content_type = content_type_for(&job.key);

        let mut failures = Vec::new();
        let mut fail = |kind: FailureKind, message: String| {
            failures.push(JobError::new(job.id, &job.key, kind, message));
        };

        let upload = match self
            .store
            .open_upload(&job.bucket, &job.key, content_type)
            .await
        {
            Ok(upload) => Some(upload),
            Err(err) => {
                fail(FailureKind::UploadOpen, err.to_string());
                None
            }
        };

        let pipe_capacity = self.settings.pipe_capacity.max(1);
        let (reader, writer) = tokio::io::duplex(pipe_capacity);
        let fetch = AbortOnDropHandle::new(tokio::spawn(fetch_into_pipe(
            self.http.clone(),
            url.clone(),
            writer,
        )));

        let mut upload_failures = Vec::new();
        let bytes = match upload {
            Some(mut upload) => {
                let (bytes, drained) = drain_pipe(reader, upload.as_mut(), pipe_capacity).await;
                if let Err(message) = drained {
                    upload_failures.push(message);
                }
                if let Err(err) = upload.close().await {
                    upload_failures.push(format!("finalizing upload: {err}"));
                }
                bytes
            }
            None => {
                drop(reader);
                0
            }
        };

        let report = match fetch.await {
            Ok(report) => report,
            Err(err) => FetchReport {
                status: 0,
                failure: Some(FetchFailure::Task(err.to_string())),
            },
        };
        if let Some(failure) = report.failure {
            if let Some(message) = failure.message() {
                fail(FailureKind::Fetch, message);
            }
        }
        for message in upload_failures {
            fail(FailureKind::Upload, message);
        }

        shuttle_debug!(
            "Relayed {} bytes from {} (status {}) into {}{}",
            bytes,
            url,
            report.status,
            job.bucket,
            job.key
        );

        let outcome = Outcome::Relayed {
            bytes,
            status: report.status,
            url,
        };
        let mut failures = failures.into_iter();
        match failures.next() {
            None => Attempt::succeeded(outcome),
            Some(first) => {
                for extra in failures {
                    shuttle_warn!("{}", extra);
                }
                Attempt::failed(outcome, first)
            }
        }
    }
}

enum FetchFailure {
    Request(FetchError),
    Status(u16),
    Body(FetchError),
    /// The read half went away; the upload side already reported why.
    ReaderGone,
    Task(String),
}

impl FetchFailure {
    fn message(&self) -> Option<String> {
        match self {
            FetchFailure::Request(err) => Some(format!("GET failed: {err}")),
            FetchFailure::Status(status) => Some(format!("http status {status}")),
            FetchFailure::Body(err) => Some(format!("reading body: {err}")),
            FetchFailure::ReaderGone => None,
            FetchFailure::Task(err) => Some(format!("fetch task: {err}")),
        }
    }
}

struct FetchReport {
    /// 0 when no response was received.
    status: u16,
    failure: Option<FetchFailure>,
}

/// Write the response body into the pipe. The pipe half is dropped on return,
/// which is what ends the reader's copy.
async fn fetch_into_pipe(http: Arc<dyn HttpGet>, url: String, mut pipe: DuplexStream) -> FetchReport {
    let response = match http.get(&url).await {
        Ok(response) => response,
        Err(err) => {
            return FetchReport {
                status: 0,
                failure: Some(FetchFailure::Request(err)),
            };
        }
    };

    let status = response.status;
    if !response.is_success() {
        return FetchReport {
            status,
            failure: Some(FetchFailure::Status(status)),
        };
    }

    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                return FetchReport {
                    status,
                    failure: Some(FetchFailure::Body(err)),
                };
            }
        };
        if pipe.write_all(&chunk).await.is_err() {
            return FetchReport {
                status,
                failure: Some(FetchFailure::ReaderGone),
            };
        }
    }

    FetchReport {
        status,
        failure: None,
    }
}

/// Copy from the pipe into the upload until end-of-stream or the first error.
/// Returns the number of bytes the upload accepted.
async fn drain_pipe(
    mut reader: DuplexStream,
    upload: &mut dyn UploadWriter,
    chunk_size: usize,
) -> (u64, Result<(), String>) {
    let mut transferred = 0u64;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let read = match reader.read(&mut buf).await {
            Ok(0) => return (transferred, Ok(())),
            Ok(read) => read,
            Err(err) => return (transferred, Err(format!("reading pipe: {err}"))),
        };
        if let Err(err) = upload.write(Bytes::copy_from_slice(&buf[..read])).await {
            return (transferred, Err(format!("writing upload: {err}")));
        }
        transferred += read as u64;
    }
}
