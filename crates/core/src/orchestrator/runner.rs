//! Download orchestrator implementation.
//!
//! One invocation runs in two phases:
//! - Gate: the run prefix is polled once, synchronously, before any
//!   timestep work exists. If the gate fails the invocation fails.
//! - Fan-out: one task per timestep (availability retry loop, then
//!   download, then the post-processing hook). Remote operations of all
//!   tasks share one semaphore; backoff sleeps hold no permit.
//!
//! Cancellation is scoped to one invocation and only interrupts checks and
//! downloads. A completed download keeps its `Success` status while its hook
//! runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::availability::{AvailabilityOutcome, CheckFailure, CheckOutcome, RetryConfig, RetryPolicy};
use crate::config::Config;
use crate::metrics;
use crate::postprocess::{create_post_processor, PostProcessor};
use crate::run::TimestepRequest;
use crate::source::{create_source, ForecastSource};
use crate::store::{create_object_store, StoreError};

use super::plan::PipelinePlan;
use super::types::{
    DownloadResult, FailureKind, OrchestratorError, PipelineResult, TimestepFailure,
    TimestepStatus,
};

/// Runs pipeline plans against a forecast source.
///
/// Holds no state between invocations; one instance can run any number of
/// plans, sequentially or concurrently.
pub struct DownloadOrchestrator {
    source: Arc<dyn ForecastSource>,
    post_processor: Option<Arc<dyn PostProcessor>>,
}

impl DownloadOrchestrator {
    pub fn new(source: Arc<dyn ForecastSource>) -> Self {
        Self {
            source,
            post_processor: None,
        }
    }

    /// Build the store, source and hook selected by configuration.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = create_object_store(&config.store).await?;
        let mut orchestrator = Self::new(create_source(&config.source, store));
        orchestrator.post_processor = create_post_processor(&config.post_process);
        Ok(orchestrator)
    }

    pub fn with_post_processor(mut self, post_processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = Some(post_processor);
        self
    }

    /// Run one invocation that cannot be cancelled.
    pub async fn run(&self, plan: &PipelinePlan) -> Result<PipelineResult, OrchestratorError> {
        self.run_until_cancelled(plan, CancellationToken::new()).await
    }

    /// Run one invocation, stopping checks and downloads once `cancel` fires.
    ///
    /// Returns a `PipelineResult` whenever the run gate passed, whatever
    /// happened to individual timesteps. The token only affects this
    /// invocation.
    pub async fn run_until_cancelled(
        &self,
        plan: &PipelinePlan,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, OrchestratorError> {
        let invocation_id = Uuid::new_v4();
        let span = info_span!(
            "pipeline",
            invocation = %invocation_id,
            name = plan.name(),
            run = %plan.run(),
        );

        let result = self
            .run_invocation(plan, invocation_id, &cancel)
            .instrument(span)
            .await;

        let outcome = match &result {
            Ok(result) => result.outcome_label(),
            Err(e) => e.outcome_label(),
        };
        metrics::PIPELINE_RUNS.with_label_values(&[outcome]).inc();

        result
    }

    async fn run_invocation(
        &self,
        plan: &PipelinePlan,
        invocation_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, OrchestratorError> {
        let started_at = Utc::now();
        info!(
            timesteps = plan.timesteps().len(),
            max_concurrent = plan.max_concurrent(),
            download_dir = %plan.download_dir().display(),
            "Starting pipeline"
        );

        let run_attempts = self.check_run_gate(plan, cancel).await?;

        let semaphore = Arc::new(Semaphore::new(plan.max_concurrent()));
        let mut handles = Vec::with_capacity(plan.timesteps().len());

        for request in plan.timesteps() {
            let task = TimestepTask {
                source: Arc::clone(&self.source),
                post_processor: self.post_processor.clone(),
                semaphore: Arc::clone(&semaphore),
                cancel: cancel.clone(),
                retry: plan.timestep_retry().clone(),
                download_dir: plan.download_dir().to_path_buf(),
                request: *request,
            };
            let span = info_span!("timestep", timestep = request.timestep);
            handles.push((*request, tokio::spawn(task.run().instrument(span))));
        }

        let mut per_timestep = BTreeMap::new();
        for (request, handle) in handles {
            let status = match handle.await {
                Ok(status) => status,
                Err(e) => {
                    error!(timestep = request.timestep, error = %e, "Timestep task failed");
                    TimestepStatus::Failed(TimestepFailure::new(
                        FailureKind::Internal,
                        self.source.timestep_key(&request),
                        format!("timestep task failed: {}", e),
                        0,
                    ))
                }
            };
            metrics::TIMESTEPS.with_label_values(&[status.label()]).inc();
            per_timestep.insert(request.timestep, status);
        }

        let result = PipelineResult {
            invocation_id,
            name: plan.name().to_string(),
            run: *plan.run(),
            run_attempts,
            started_at,
            finished_at: Utc::now(),
            per_timestep,
        };

        let failed = result.failed();
        if failed.is_empty() {
            info!(downloaded = result.succeeded().len(), "Pipeline completed");
        } else {
            warn!(
                downloaded = result.succeeded().len(),
                failed = ?failed,
                "Pipeline completed with failed timesteps"
            );
        }

        Ok(result)
    }

    /// Poll the run prefix until it exists. Returns the number of checks.
    async fn check_run_gate(
        &self,
        plan: &PipelinePlan,
        cancel: &CancellationToken,
    ) -> Result<u32, OrchestratorError> {
        let run = *plan.run();
        let on_absent = plan.run_retry().on_absent;
        let policy = RetryPolicy::from(plan.run_retry());
        let source = &self.source;

        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled { run, at: Utc::now() });
        }

        let gate = policy.attempt(|attempt| async move {
            debug!(attempt, "Checking run availability");
            source.check_run(&run, on_absent).await
        });

        let outcome = tokio::select! {
            outcome = gate => outcome,
            _ = cancel.cancelled() => {
                warn!("Cancelled while waiting for run");
                return Err(OrchestratorError::Cancelled { run, at: Utc::now() });
            }
        };

        match outcome {
            AvailabilityOutcome::Available { attempts, .. } => {
                info!(attempts, prefix = %source.run_prefix(&run), "Run available");
                Ok(attempts)
            }
            AvailabilityOutcome::Exhausted {
                attempts,
                last_checked_at,
                last_failure,
            } => {
                warn!(attempts, reason = %last_failure, "Run retry budget exhausted");
                Err(OrchestratorError::RunRetriesExhausted {
                    run,
                    attempts,
                    last_checked_at,
                    reason: last_failure,
                })
            }
            AvailabilityOutcome::Aborted {
                attempts,
                at,
                failure,
            } => {
                if failure.is_absent() {
                    info!(attempts, "Run not yet available");
                    Err(OrchestratorError::RunNotYetAvailable {
                        run,
                        attempts,
                        checked_at: at,
                    })
                } else {
                    warn!(attempts, reason = %failure, "Run check failed");
                    Err(OrchestratorError::RunCheckFailed {
                        run,
                        attempts,
                        at,
                        failure,
                    })
                }
            }
            AvailabilityOutcome::Pending {
                last_checked_at, ..
            } => Err(OrchestratorError::RunNotYetAvailable {
                run,
                attempts: 1,
                checked_at: last_checked_at,
            }),
        }
    }
}

/// Everything one timestep task owns.
struct TimestepTask {
    source: Arc<dyn ForecastSource>,
    post_processor: Option<Arc<dyn PostProcessor>>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    retry: RetryConfig,
    download_dir: PathBuf,
    request: TimestepRequest,
}

impl TimestepTask {
    async fn run(self) -> TimestepStatus {
        let key = self.source.timestep_key(&self.request);
        let attempts = AtomicU32::new(0);

        if self.cancel.is_cancelled() {
            return cancelled(key, 0);
        }

        let status = tokio::select! {
            status = self.process(&key, &attempts) => status,
            _ = self.cancel.cancelled() => {
                warn!(key = %key, "Timestep cancelled");
                cancelled(key.clone(), attempts.load(Ordering::SeqCst))
            }
        };

        // The hook is not raced against cancellation.
        if let TimestepStatus::Success(download) = &status {
            self.post_process(&download.local_path).await;
        }
        status
    }

    async fn process(&self, key: &str, attempts: &AtomicU32) -> TimestepStatus {
        let policy = RetryPolicy::from(&self.retry);
        let on_absent = self.retry.on_absent;

        let outcome = policy
            .attempt(|attempt| async move {
                attempts.store(attempt, Ordering::SeqCst);
                let _permit = match self.permit(key).await {
                    Ok(permit) => permit,
                    Err(failure) => return CheckOutcome::Fatal(failure),
                };
                self.source.check_timestep(&self.request, on_absent).await
            })
            .await;

        match outcome {
            AvailabilityOutcome::Available { attempts, .. } => {
                info!(key, attempts, "Timestep available");
                self.download(key, attempts).await
            }
            AvailabilityOutcome::Exhausted {
                attempts,
                last_failure,
                ..
            } => {
                warn!(
                    key,
                    attempts,
                    reason = %last_failure,
                    "Timestep retry budget exhausted"
                );
                failed(FailureKind::Exhausted, key, last_failure.to_string(), attempts)
            }
            AvailabilityOutcome::Aborted {
                attempts, failure, ..
            } => {
                let kind = if failure.is_absent() {
                    FailureKind::NotYetAvailable
                } else {
                    FailureKind::CheckFailed
                };
                warn!(key, attempts, reason = %failure, "Timestep check aborted");
                failed(kind, key, failure.to_string(), attempts)
            }
            AvailabilityOutcome::Pending { reason, .. } => {
                failed(FailureKind::NotYetAvailable, key, reason.to_string(), 1)
            }
        }
    }

    async fn download(&self, key: &str, attempts: u32) -> TimestepStatus {
        let started = Instant::now();
        let downloaded = match self.permit(key).await {
            Ok(_permit) => self.source.download(&self.request, &self.download_dir).await,
            Err(failure) => Err(StoreError::Service {
                message: failure.to_string(),
            }),
        };
        let elapsed = started.elapsed().as_secs_f64();

        let path = match downloaded {
            Ok(path) => path,
            Err(e) => {
                metrics::DOWNLOADS.with_label_values(&["failed"]).inc();
                metrics::DOWNLOAD_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                warn!(key, error = %e, "Download failed");
                return failed(FailureKind::DownloadFailed, key, e.to_string(), attempts);
            }
        };

        let size_bytes = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
        metrics::DOWNLOADS.with_label_values(&["completed"]).inc();
        metrics::DOWNLOAD_DURATION
            .with_label_values(&["completed"])
            .observe(elapsed);
        if let Some(bytes) = size_bytes {
            metrics::DOWNLOAD_BYTES.inc_by(bytes);
        }
        info!(
            key,
            path = %path.display(),
            size_bytes = size_bytes.unwrap_or(0),
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Download completed"
        );

        TimestepStatus::Success(DownloadResult {
            request: self.request,
            key: key.to_string(),
            local_path: path,
            size_bytes,
            attempts,
            completed_at: Utc::now(),
        })
    }

    /// Hook errors are logged and counted only.
    async fn post_process(&self, path: &Path) {
        let Some(hook) = &self.post_processor else {
            return;
        };
        match hook.process(&self.request, path).await {
            Ok(()) => {
                metrics::POST_PROCESS.with_label_values(&["ok"]).inc();
            }
            Err(e) => {
                metrics::POST_PROCESS.with_label_values(&["failed"]).inc();
                warn!(
                    hook = hook.name(),
                    path = %path.display(),
                    error = %e,
                    "Post-processing failed"
                );
            }
        }
    }

    /// One slot of the shared I/O budget.
    async fn permit(&self, key: &str) -> Result<SemaphorePermit<'_>, CheckFailure> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| CheckFailure::Store {
                prefix: key.to_string(),
                error_kind: "internal".to_string(),
                message: e.to_string(),
            })
    }
}

fn failed(kind: FailureKind, key: &str, message: String, attempts: u32) -> TimestepStatus {
    TimestepStatus::Failed(TimestepFailure::new(kind, key, message, attempts))
}

fn cancelled(key: String, attempts: u32) -> TimestepStatus {
    TimestepStatus::Failed(TimestepFailure::new(
        FailureKind::Cancelled,
        key,
        "cancelled before completion",
        attempts,
    ))
}
