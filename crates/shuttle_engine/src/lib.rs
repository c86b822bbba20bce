//! Shuttle engine: the job pipeline, the two operations and their remote capabilities.
mod collector;
mod copy;
mod error;
mod fetch;
mod operation;
mod pipeline;
mod pool;
mod relay;
mod s3;
mod settings;
mod source;
mod store;

pub use collector::{LogResultSink, ResultCollector, ResultSink, RunSummary};
pub use copy::MetadataCopy;
pub use error::{FetchError, SetupError, StoreError};
pub use fetch::{FetchResponse, HttpGet, ReqwestFetcher};
pub use operation::{Attempt, Operation};
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
pub use relay::{resolve_url, StreamingRelay};
pub use s3::{S3Credentials, S3Store};
pub use settings::{FetchSettings, PipelineSettings, RelaySettings, S3Settings};
pub use source::{JobSource, JobTemplate};
pub use store::{CopyOutput, CopyRequest, ObjectStore, UploadWriter};
