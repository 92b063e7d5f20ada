//! Pipeline lifecycle integration tests.
//!
//! These tests drive the orchestrator end to end against the mock store:
//! run gate -> per-timestep availability -> download -> aggregate result

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use nwp_fetch_core::{
    testing::{fixtures, MockObjectStore, MockPostProcessor},
    CheckFailure, Config, DownloadOrchestrator, FailureKind, GfsSource, KeyScheme, ObjectStore,
    OrchestratorError, PipelinePlan, PostProcessor, RetryConfig, RunParameters, StoreError,
    TimestepStatus,
};

/// Test helper wiring a mock store to an orchestrator.
struct TestHarness {
    store: Arc<MockObjectStore>,
    download_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            store: Arc::new(MockObjectStore::new()),
            download_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// A harness whose store already holds the fixture run's timesteps.
    async fn with_published(timesteps: &[u32]) -> Self {
        let harness = Self::new();
        fixtures::seed_run(&harness.store, &fixtures::run(), timesteps).await;
        harness
    }

    fn orchestrator(&self) -> DownloadOrchestrator {
        let source = GfsSource::new(
            KeyScheme::gfs(),
            Arc::clone(&self.store) as Arc<dyn ObjectStore>,
        );
        DownloadOrchestrator::new(Arc::new(source))
    }

    /// Six attempts per check site, one minute apart.
    fn config(&self) -> Config {
        let mut config = Config::default();
        config.retry.run = RetryConfig::default().with_max_attempts(6).with_backoff(60, 1.0);
        config.retry.timestep = RetryConfig::default().with_max_attempts(6).with_backoff(60, 1.0);
        config.download.dir = self.download_dir.path().to_path_buf();
        config
    }

    fn plan(&self, timesteps: &[i64], max_concurrent: usize) -> PipelinePlan {
        self.plan_from(&self.config(), timesteps, max_concurrent)
    }

    fn plan_from(&self, config: &Config, timesteps: &[i64], max_concurrent: usize) -> PipelinePlan {
        PipelinePlan::build(
            config,
            RunParameters::new(0)
                .with_date("20201215")
                .with_timesteps(timesteps.to_vec())
                .with_max_concurrent(max_concurrent),
        )
        .expect("Failed to build plan")
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_gate_exhausted_schedules_no_timestep() {
    let harness = TestHarness::new();
    let start = Instant::now();

    let err = assert_err!(harness.orchestrator().run(&harness.plan(&[3, 6], 5)).await);

    match &err {
        OrchestratorError::RunRetriesExhausted {
            run,
            attempts,
            reason,
            ..
        } => {
            assert_eq!(run.to_string(), "20201215/00");
            assert_eq!(*attempts, 6);
            assert!(matches!(reason, CheckFailure::Absent { .. }));
        }
        other => panic!("expected RunRetriesExhausted, got {other:?}"),
    }
    assert!(err.gave_up());

    // Only the run prefix was ever listed, and nothing was downloaded.
    assert_eq!(harness.store.list_calls_for(&fixtures::run_prefix()).await, 6);
    assert_eq!(harness.store.list_calls().await, 6);
    assert!(harness.store.download_calls().await.is_empty());

    // Five one-minute delays between six attempts.
    assert!(start.elapsed() >= Duration::from_secs(300));
    assert!(start.elapsed() < Duration::from_secs(301));
}

#[tokio::test(start_paused = true)]
async fn test_run_gate_waits_for_late_run() {
    let harness = TestHarness::with_published(&[3]).await;
    harness
        .store
        .set_available_after(fixtures::run_prefix(), 2)
        .await;

    let result = assert_ok!(harness.orchestrator().run(&harness.plan(&[3], 5)).await);

    assert_eq!(result.run_attempts, 3);
    assert!(result.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_partial_failure_is_isolated() {
    // Timestep 3 is published, timestep 6 never shows up.
    let harness = TestHarness::with_published(&[3]).await;

    let result = assert_ok!(harness.orchestrator().run(&harness.plan(&[3, 6], 5)).await);

    assert_eq!(result.per_timestep.len(), 2);
    match result.status(3).unwrap() {
        TimestepStatus::Success(download) => {
            assert_eq!(
                download.local_path,
                harness.download_dir.path().join(fixtures::timestep_key(3))
            );
            assert_eq!(
                std::fs::read(&download.local_path).unwrap(),
                fixtures::grib_payload(3)
            );
        }
        other => panic!("expected success for f003, got {other:?}"),
    }

    let failure = result.status(6).unwrap().failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Exhausted);
    assert_eq!(failure.attempts, 6);
    assert_eq!(failure.key, fixtures::timestep_key(6));

    assert_eq!(
        harness.store.download_calls().await,
        vec![fixtures::timestep_key(3)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_timestep_published_during_polling() {
    let harness = TestHarness::with_published(&[3, 6]).await;
    harness
        .store
        .set_available_after(fixtures::timestep_key(6), 4)
        .await;

    let result = assert_ok!(harness.orchestrator().run(&harness.plan(&[3, 6], 5)).await);

    assert!(result.is_complete());
    match result.status(6).unwrap() {
        TimestepStatus::Success(download) => assert_eq!(download.attempts, 5),
        other => panic!("expected success for f006, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_bound_holds() {
    let timesteps = [0u32, 3, 6, 9, 12];
    let harness = TestHarness::with_published(&timesteps).await;
    harness
        .store
        .set_download_delay(Duration::from_secs(10))
        .await;
    harness.store.set_list_delay(Duration::from_secs(1)).await;

    let raw: Vec<i64> = timesteps.iter().map(|t| i64::from(*t)).collect();
    let result = assert_ok!(harness.orchestrator().run(&harness.plan(&raw, 2)).await);

    assert!(result.is_complete());
    assert_eq!(harness.store.download_calls().await.len(), 5);
    assert!(harness.store.peak_concurrent_downloads() <= 2);
    assert!(harness.store.peak_concurrent_requests() <= 2);
    // The bound was actually reached.
    assert_eq!(harness.store.peak_concurrent_downloads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_retried() {
    let harness = TestHarness::with_published(&[3]).await;
    harness
        .store
        .fail_list(
            fixtures::timestep_key(3),
            StoreError::Network {
                key: fixtures::timestep_key(3),
                message: "connection reset by peer".to_string(),
            },
        )
        .await;

    let result = assert_ok!(harness.orchestrator().run(&harness.plan(&[3], 5)).await);

    match result.status(3).unwrap() {
        TimestepStatus::Success(download) => assert_eq!(download.attempts, 2),
        other => panic!("expected success after a transient error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_permanent_run_check_error_gives_up_at_once() {
    let harness = TestHarness::with_published(&[3]).await;
    harness
        .store
        .fail_next_list(StoreError::PermissionDenied {
            key: fixtures::run_prefix(),
        })
        .await;

    let err = assert_err!(harness.orchestrator().run(&harness.plan(&[3], 5)).await);

    assert!(matches!(
        err,
        OrchestratorError::RunCheckFailed { attempts: 1, .. }
    ));
    assert!(err.gave_up());
    assert!(harness.store.download_calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_run() {
    let harness = TestHarness::new();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(90)).await;
        canceller.cancel();
    });

    let err = assert_err!(
        harness
            .orchestrator()
            .run_until_cancelled(&harness.plan(&[3, 6], 5), cancel)
            .await
    );

    assert!(matches!(err, OrchestratorError::Cancelled { .. }));
    assert!(!err.gave_up());
    // Checks at 0s and 60s, cancelled before the one at 120s.
    assert_eq!(harness.store.list_calls().await, 2);
    assert!(harness.store.download_calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_post_processor_sees_every_download() {
    let harness = TestHarness::with_published(&[3, 6]).await;
    let hook = Arc::new(MockPostProcessor::new());

    let result = assert_ok!(
        harness
            .orchestrator()
            .with_post_processor(Arc::clone(&hook) as Arc<dyn PostProcessor>)
            .run(&harness.plan(&[3, 6], 1))
            .await
    );

    assert!(result.is_complete());
    let mut processed = hook.processed().await;
    processed.sort();
    assert_eq!(
        processed,
        vec![
            harness.download_dir.path().join(fixtures::timestep_key(3)),
            harness.download_dir.path().join(fixtures::timestep_key(6)),
        ]
    );
}

#[tokio::test]
async fn test_redownload_overwrites() {
    let harness = TestHarness::with_published(&[3]).await;
    let orchestrator = harness.orchestrator();
    let plan = harness.plan(&[3], 1);

    let first = assert_ok!(orchestrator.run(&plan).await);
    harness
        .store
        .put_object(fixtures::timestep_key(3), b"republished".to_vec())
        .await;
    let second = assert_ok!(orchestrator.run(&plan).await);

    assert_ne!(first.invocation_id, second.invocation_id);
    let path = harness.download_dir.path().join(fixtures::timestep_key(3));
    assert_eq!(std::fs::read(path).unwrap(), b"republished");
}
