use std::sync::Arc;

use shuttle_core::{Job, JobResult};
use shuttle_logging::{shuttle_debug, shuttle_error, shuttle_warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::operation::Operation;
use crate::PipelineSettings;

type SharedJobs = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Fixed set of workers draining the job queue with one operation.
pub struct WorkerPool {
    settings: PipelineSettings,
    operation: Arc<dyn Operation>,
    jobs: SharedJobs,
    results: mpsc::Sender<JobResult>,
}

impl WorkerPool {
    pub fn new(
        settings: PipelineSettings,
        operation: Arc<dyn Operation>,
        jobs: mpsc::Receiver<Job>,
        results: mpsc::Sender<JobResult>,
    ) -> Self {
        Self {
            settings,
            operation,
            jobs: Arc::new(Mutex::new(jobs)),
            results,
        }
    }

    /// Start the workers with `ramp_delay` between consecutive starts and wait
    /// until every one of them has seen the job queue closed and empty.
    ///
    /// The result queue closes once this returns, as the pool and its workers
    /// hold its last senders.
    pub async fn run(self) {
        let worker_count = self.settings.workers.max(1);
        let mut workers = JoinSet::new();

        for index in 0..worker_count {
            if index > 0 && !self.settings.ramp_delay.is_zero() {
                // Slow the initial request rate down.
                tokio::time::sleep(self.settings.ramp_delay).await;
            }
            workers.spawn(worker_loop(
                index,
                self.jobs.clone(),
                self.results.clone(),
                self.operation.clone(),
            ));
            shuttle_debug!("Started worker {}", index);
        }
        drop(self.results);

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                shuttle_error!("Worker exited abnormally: {}", err);
            }
        }
        shuttle_debug!("All {} workers exited", worker_count);
    }
}

async fn worker_loop(
    index: usize,
    jobs: SharedJobs,
    results: mpsc::Sender<JobResult>,
    operation: Arc<dyn Operation>,
) {
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        let attempt = operation.execute(&job).await;
        if let Some(err) = &attempt.error {
            shuttle_warn!("{}", err);
        }

        let result = JobResult {
            job,
            outcome: attempt.outcome,
            error: attempt.error,
        };
        if results.send(result).await.is_err() {
            shuttle_error!("Result queue closed; worker {} stopping", index);
            break;
        }
    }
    shuttle_debug!("Worker {} found the job queue drained", index);
}
