mod common;

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{MemoryStore, VecSink};
use shuttle_core::{FailureKind, Job, JobError, Outcome};
use shuttle_engine::{
    Attempt, FetchSettings, JobSource, JobTemplate, MetadataCopy, Operation, Pipeline,
    PipelineSettings, RelaySettings, ReqwestFetcher, RunSummary, StreamingRelay,
};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records when each job was picked up and fails every job with an even id.
struct ProbeOperation {
    work: Duration,
    picks: Mutex<Vec<Instant>>,
}

impl ProbeOperation {
    fn new(work: Duration) -> Self {
        Self {
            work,
            picks: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Operation for ProbeOperation {
    async fn execute(&self, job: &Job) -> Attempt {
        self.picks.lock().unwrap().push(Instant::now());
        tokio::time::sleep(self.work).await;
        let outcome = Outcome::Copied {
            content_type: "text/plain; charset=utf-8".into(),
            last_modified: None,
        };
        if job.id % 2 == 0 {
            Attempt::failed(
                outcome,
                JobError::new(job.id, &job.key, FailureKind::RemoteCopy, "probe"),
            )
        } else {
            Attempt::succeeded(outcome)
        }
    }
}

fn settings(workers: usize, ramp_ms: u64) -> PipelineSettings {
    PipelineSettings {
        workers,
        ramp_delay: Duration::from_millis(ramp_ms),
        queue_capacity: 8,
    }
}

fn input(lines: &[String]) -> Cursor<Vec<u8>> {
    Cursor::new(lines.join("\n").into_bytes())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_job_yields_exactly_one_result() {
    let lines: Vec<String> = (0..50).map(|i| format!("{i:03}/obj/{i}.txt")).collect();
    let sink = VecSink::default();
    let operation = Arc::new(ProbeOperation::new(Duration::from_millis(1)));

    let summary = Pipeline::new(settings(4, 0))
        .run(input(&lines), JobTemplate::new("demo"), operation, sink.clone())
        .await;

    assert_eq!(
        summary,
        RunSummary {
            submitted: 50,
            processed: 50,
            failed: 25,
        }
    );

    let results = sink.take();
    assert_eq!(results.len(), 50);
    let ids: HashSet<_> = results.iter().map(|r| r.job.id).collect();
    assert_eq!(ids, (0..50).collect::<HashSet<_>>());
    for result in &results {
        assert_eq!(result.job.key, format!("/obj/{}.txt", result.job.id));
        assert_eq!(result.is_success(), result.job.id % 2 == 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn workers_start_with_ramp_up_delay() {
    let ramp = Duration::from_millis(60);
    let lines: Vec<String> = (0..3).map(|i| format!("/k/{i}")).collect();
    let operation = Arc::new(ProbeOperation::new(Duration::from_millis(400)));

    let start = Instant::now();
    let summary = Pipeline::new(settings(3, 60))
        .run(
            input(&lines),
            JobTemplate::new("demo"),
            operation.clone(),
            VecSink::default(),
        )
        .await;
    assert_eq!(summary.processed, 3);

    let mut picks = operation.picks.lock().unwrap().clone();
    picks.sort();
    assert_eq!(picks.len(), 3);
    for (index, pick) in picks.iter().enumerate() {
        assert!(
            pick.duration_since(start) >= ramp * index as u32,
            "worker {index} started too early: {:?}",
            pick.duration_since(start)
        );
    }
}

#[tokio::test]
async fn empty_input_closes_everything() {
    let summary = Pipeline::new(settings(2, 0))
        .run(
            &b""[..],
            JobTemplate::new("demo"),
            Arc::new(ProbeOperation::new(Duration::ZERO)),
            VecSink::default(),
        )
        .await;
    assert_eq!(summary, RunSummary::default());
}

#[tokio::test]
async fn job_source_numbers_jobs_by_input_line_and_skips_blank_lines() {
    let (tx, mut rx) = mpsc::channel(16);
    let template = JobTemplate::new("demo").with_origin("http://origin");
    let submitted = JobSource::new(&b"001/a/b.png\n\n42\n002/c/d.jpg\r\n"[..], template, tx)
        .run()
        .await;
    assert_eq!(submitted, 3);

    let mut jobs = Vec::new();
    while let Some(job) = rx.recv().await {
        jobs.push(job);
    }
    assert_eq!(
        jobs,
        vec![
            Job::new(0, "demo", "/a/b.png").with_origin("http://origin"),
            Job::new(2, "demo", "").with_origin("http://origin"),
            Job::new(3, "demo", "/c/d.jpg").with_origin("http://origin"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn digits_only_line_yields_an_input_error_result() {
    shuttle_logging::initialize_for_tests();
    let store = Arc::new(MemoryStore::default());
    let sink = VecSink::default();

    let summary = Pipeline::new(settings(2, 0))
        .run(
            &b"001/a/b.png\n42\n003/c/d.jpg\n"[..],
            JobTemplate::new("demo"),
            Arc::new(MetadataCopy::new(store.clone())),
            sink.clone(),
        )
        .await;
    assert_eq!(
        summary,
        RunSummary {
            submitted: 3,
            processed: 3,
            failed: 1,
        }
    );

    let mut results = sink.take();
    results.sort_by_key(|r| r.job.id);
    let seen: Vec<_> = results
        .iter()
        .map(|r| (r.job.id, r.job.key.as_str(), r.error.as_ref().map(|e| e.kind)))
        .collect();
    assert_eq!(
        seen,
        vec![
            (0, "/a/b.png", None),
            (1, "", Some(FailureKind::Input)),
            (2, "/c/d.jpg", None),
        ]
    );
    assert_eq!(results[1].outcome, Outcome::copy_failed());
    assert_eq!(store.copies().len(), 2);
}

#[tokio::test]
async fn job_source_blocks_while_the_queue_is_full() {
    let (tx, mut rx) = mpsc::channel(1);
    let source = tokio::spawn(
        JobSource::new(&b"/a\n/b\n/c\n"[..], JobTemplate::new("demo"), tx).run(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!source.is_finished());

    let mut ids = Vec::new();
    while let Some(job) = rx.recv().await {
        ids.push(job.id);
    }
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(source.await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metadata_copy_end_to_end() {
    let store = Arc::new(MemoryStore::default());
    let sink = VecSink::default();

    let summary = Pipeline::new(settings(2, 0))
        .run(
            &b"001/a/b.png\n002/c/d.jpg\n"[..],
            JobTemplate::new("demo"),
            Arc::new(MetadataCopy::new(store.clone())),
            sink.clone(),
        )
        .await;
    assert_eq!(summary.failed, 0);

    let mut results = sink.take();
    results.sort_by_key(|r| r.job.id);
    let seen: Vec<_> = results
        .iter()
        .map(|r| (r.job.key.clone(), r.outcome.clone()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (
                "/a/b.png".to_string(),
                Outcome::Copied {
                    content_type: "image/png".into(),
                    last_modified: None
                }
            ),
            (
                "/c/d.jpg".to_string(),
                Outcome::Copied {
                    content_type: "image/jpeg".into(),
                    last_modified: None
                }
            ),
        ]
    );

    let mut sources: Vec<_> = store.copies().into_iter().map(|c| c.copy_source).collect();
    sources.sort();
    assert_eq!(sources, vec!["demo/a/b.png", "demo/c/d.jpg"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_end_to_end_continues_after_404() {
    shuttle_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/demo/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/demo/present.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("here"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::default());
    let fetcher = Arc::new(ReqwestFetcher::new(&FetchSettings::default()).unwrap());
    let relay = StreamingRelay::new(store.clone(), fetcher, RelaySettings::new("demo"));
    let sink = VecSink::default();

    let summary = Pipeline::new(settings(1, 0))
        .run(
            &b"1/missing.png\n2/present.txt\n"[..],
            JobTemplate::new("demo").with_origin(server.uri()),
            Arc::new(relay),
            sink.clone(),
        )
        .await;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);

    let mut results = sink.take();
    results.sort_by_key(|r| r.job.id);
    assert_eq!(
        results[0].outcome,
        Outcome::Relayed {
            bytes: 0,
            status: 404,
            url: format!("{}/demo/missing.png", server.uri()),
        }
    );
    assert_eq!(results[0].error.as_ref().unwrap().kind, FailureKind::Fetch);
    assert_eq!(
        results[1].outcome,
        Outcome::Relayed {
            bytes: 4,
            status: 200,
            url: format!("{}/demo/present.txt", server.uri()),
        }
    );
    assert!(results[1].is_success());
}
