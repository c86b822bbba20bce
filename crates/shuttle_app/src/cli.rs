use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use shuttle_engine::{FetchSettings, PipelineSettings, RelaySettings, S3Settings};
use shuttle_logging::LogDestination;

/// Reads object keys from stdin and processes each one against a bucket.
#[derive(Debug, Parser)]
#[command(name = "s3shuttle", version)]
pub struct Cli {
    /// The concurrent number of workers to start.
    #[arg(short = 'c', long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// The millisecond delay between starting workers.
    #[arg(short = 'd', long, default_value_t = 1000)]
    pub delay: u64,

    /// The bucket to operate on.
    #[arg(short = 's', long)]
    pub bucket: String,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Endpoint of an S3-compatible service. Implies path-style addressing.
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub endpoint: Option<String>,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy each object onto itself, replacing metadata with a content type
    /// derived from the key's extension.
    CopyMetadata,
    /// Stream each object from an HTTP origin into the bucket.
    Relay(RelayArgs),
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// The base hostname to fetch from.
    #[arg(short = 'b', long)]
    pub base_host: String,

    /// The prefix to use on the request path. Defaults to the bucket name.
    #[arg(short = 'p', long)]
    pub prefix: Option<String>,

    #[arg(long, default_value = "http")]
    pub scheme: String,

    /// Give up on an origin request after this many seconds. Unbounded if unset.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            workers: usize::from(self.concurrency),
            ramp_delay: Duration::from_millis(self.delay),
            ..PipelineSettings::default()
        }
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint_url: self.endpoint.clone(),
            ..S3Settings::default()
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

impl RelayArgs {
    pub fn origin(&self) -> String {
        if self.base_host.contains("://") {
            self.base_host.clone()
        } else {
            format!("{}://{}", self.scheme, self.base_host)
        }
    }

    pub fn relay_settings(&self, bucket: &str) -> RelaySettings {
        RelaySettings::new(self.prefix.clone().unwrap_or_else(|| bucket.to_string()))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: self.timeout_secs.map(Duration::from_secs),
            ..FetchSettings::default()
        }
    }
}
