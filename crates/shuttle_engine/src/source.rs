use shuttle_core::{sanitize_line, Job, JobId};
use shuttle_logging::{shuttle_debug, shuttle_error, shuttle_warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Fields shared by every job of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    pub bucket: String,
    pub origin: Option<String>,
}

impl JobTemplate {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn job(&self, id: JobId, key: &str) -> Job {
        Job {
            id,
            origin: self.origin.clone(),
            bucket: self.bucket.clone(),
            key: key.to_string(),
        }
    }
}

/// Reads newline-delimited keys and feeds them into the job queue.
pub struct JobSource<R> {
    input: R,
    template: JobTemplate,
    jobs: mpsc::Sender<Job>,
}

impl<R> JobSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(input: R, template: JobTemplate, jobs: mpsc::Sender<Job>) -> Self {
        Self {
            input,
            template,
            jobs,
        }
    }

    /// Runs until end of input and returns the number of jobs enqueued.
    ///
    /// A job's id is its zero-based input line number. Blank lines are skipped
    /// but still counted. A line that sanitizes to an empty key is enqueued as
    /// is, and the operation reports it as an input error.
    ///
    /// Blocks while the queue is full. The queue is closed when this returns,
    /// since the source owns its only sender.
    pub async fn run(self) -> u64 {
        let mut lines = self.input.lines();
        let mut line_no: JobId = 0;
        let mut submitted = 0u64;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    shuttle_error!("Failed reading input after {} lines: {}", line_no, err);
                    break;
                }
            };
            let id = line_no;
            line_no += 1;

            if line.trim_end_matches('\r').is_empty() {
                shuttle_debug!("Skipping blank input line {}", id);
                continue;
            }

            let key = sanitize_line(&line);
            if self.jobs.send(self.template.job(id, key)).await.is_err() {
                shuttle_warn!("Job queue closed before input ended; stopping intake");
                break;
            }
            submitted += 1;
        }

        shuttle_debug!("Input exhausted after {} lines, {} jobs", line_no, submitted);
        submitted
    }
}
