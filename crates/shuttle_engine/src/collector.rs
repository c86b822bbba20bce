use std::fmt;

use shuttle_core::JobResult;
use shuttle_logging::shuttle_info;
use tokio::sync::{mpsc, oneshot};

/// Where collected results are reported.
pub trait ResultSink: Send + Sync {
    fn emit(&self, result: &JobResult);
}

/// Writes one info line per result.
pub struct LogResultSink;

impl ResultSink for LogResultSink {
    fn emit(&self, result: &JobResult) {
        shuttle_info!("{}", result);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: u64,
    pub processed: u64,
    pub failed: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {} of {} jobs, {} failed",
            self.processed, self.submitted, self.failed
        )
    }
}

/// Drains the result queue in arrival order.
pub struct ResultCollector<S> {
    results: mpsc::Receiver<JobResult>,
    sink: S,
}

impl<S> ResultCollector<S>
where
    S: ResultSink,
{
    pub fn new(results: mpsc::Receiver<JobResult>, sink: S) -> Self {
        Self { results, sink }
    }

    /// Emit every result until the queue is closed and empty, then signal `done`
    /// with the processed and failed counts (`submitted` is left at zero).
    pub async fn run(mut self, done: oneshot::Sender<RunSummary>) {
        let mut summary = RunSummary::default();
        while let Some(result) = self.results.recv().await {
            summary.processed += 1;
            if !result.is_success() {
                summary.failed += 1;
            }
            self.sink.emit(&result);
        }
        let _ = done.send(summary);
    }
}
