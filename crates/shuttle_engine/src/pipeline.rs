use std::sync::Arc;

use shuttle_logging::shuttle_error;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, oneshot};

use crate::collector::{ResultCollector, ResultSink, RunSummary};
use crate::operation::Operation;
use crate::pool::WorkerPool;
use crate::source::{JobSource, JobTemplate};
use crate::PipelineSettings;

/// One run: job source -> job queue -> worker pool -> result queue -> collector.
///
/// Queues are created per run, so a `Pipeline` can be reused.
pub struct Pipeline {
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    /// Returns once intake has closed, every worker has exited and the
    /// collector has drained the result queue.
    pub async fn run<R, S>(
        &self,
        input: R,
        template: JobTemplate,
        operation: Arc<dyn Operation>,
        sink: S,
    ) -> RunSummary
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: ResultSink + 'static,
    {
        let capacity = self.settings.queue_capacity.max(1);
        let (job_tx, job_rx) = mpsc::channel(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);

        let source = tokio::spawn(JobSource::new(input, template, job_tx).run());
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(ResultCollector::new(result_rx, sink).run(done_tx));

        WorkerPool::new(self.settings.clone(), operation, job_rx, result_tx)
            .run()
            .await;

        let submitted = match source.await {
            Ok(submitted) => submitted,
            Err(err) => {
                shuttle_error!("Job source exited abnormally: {}", err);
                0
            }
        };
        let mut summary = match done_rx.await {
            Ok(summary) => summary,
            Err(_) => {
                shuttle_error!("Result collector exited without reporting");
                RunSummary::default()
            }
        };
        summary.submitted = submitted;
        summary
    }
}
