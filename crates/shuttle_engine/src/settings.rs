use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workers: usize,
    /// Pause between starting consecutive workers.
    pub ramp_delay: Duration,
    /// Capacity of both the job queue and the result queue.
    pub queue_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            ramp_delay: Duration::from_millis(1000),
            queue_capacity: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Path segment placed between the origin and the escaped key.
    pub path_prefix: String,
    /// Internal buffer of the pipe joining the HTTP body to the upload.
    pub pipe_capacity: usize,
}

impl RelaySettings {
    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            pipe_capacity: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// `None` blocks for as long as the origin keeps the request open.
    pub request_timeout: Option<Duration>,
    pub max_idle_per_host: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_idle_per_host: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    /// Custom endpoint for S3-compatible services; implies path-style addressing.
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    /// Multipart part size for uploads. S3 rejects non-final parts under 5 MiB.
    pub part_size: usize,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            part_size: 5 * 1024 * 1024,
        }
    }
}
