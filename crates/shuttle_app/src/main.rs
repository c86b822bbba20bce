mod cli;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use shuttle_engine::{
    JobTemplate, LogResultSink, MetadataCopy, Operation, Pipeline, ReqwestFetcher, S3Credentials,
    S3Store, SetupError, StreamingRelay,
};
use shuttle_logging::{shuttle_error, shuttle_info};
use tokio::io::BufReader;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    shuttle_logging::initialize(cli.log_destination(), LevelFilter::Info);
    let started = Instant::now();

    let (template, operation) = match build_operation(&cli) {
        Ok(built) => built,
        Err(err) => {
            shuttle_error!("Setup failed: {:#}", err);
            return Err(err);
        }
    };

    let summary = Pipeline::new(cli.pipeline_settings())
        .run(
            BufReader::new(tokio::io::stdin()),
            template,
            operation,
            LogResultSink,
        )
        .await;

    shuttle_info!("{}", summary);
    println!("{}", timing_line(started.elapsed()));
    Ok(())
}

/// Final stdout line; the double space after "taken" is part of the format.
fn timing_line(elapsed: Duration) -> String {
    format!("total time taken  {} seconds", elapsed.as_secs_f64())
}

/// Everything that can fail before the first worker starts.
fn build_operation(cli: &Cli) -> anyhow::Result<(JobTemplate, Arc<dyn Operation>)> {
    let credentials =
        S3Credentials::from_env().context("resolving object-storage credentials")?;
    let store = Arc::new(S3Store::new(&cli.s3_settings(), credentials));

    match &cli.command {
        Command::CopyMetadata => {
            let copy: Arc<dyn Operation> = Arc::new(MetadataCopy::new(store));
            Ok((JobTemplate::new(&cli.bucket), copy))
        }
        Command::Relay(args) => {
            let fetcher = ReqwestFetcher::new(&args.fetch_settings())
                .map_err(SetupError::from)
                .context("building the HTTP client")?;
            let relay: Arc<dyn Operation> = Arc::new(StreamingRelay::new(
                store,
                Arc::new(fetcher),
                args.relay_settings(&cli.bucket),
            ));
            Ok((
                JobTemplate::new(&cli.bucket).with_origin(args.origin()),
                relay,
            ))
        }
    }
}
