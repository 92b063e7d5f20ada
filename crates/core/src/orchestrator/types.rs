//! Types for the download orchestrator.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::availability::CheckFailure;
use crate::run::{InvalidArgument, RunIdentifier, TimestepRequest};

/// Fatal, invocation-level errors. When one of these is returned no
/// `PipelineResult` exists.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed trigger input.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// The run never appeared within the run gate's retry budget.
    #[error("run {run} still unavailable after {attempts} attempts (last checked {last_checked_at}): {reason}")]
    RunRetriesExhausted {
        run: RunIdentifier,
        attempts: u32,
        last_checked_at: DateTime<Utc>,
        reason: CheckFailure,
    },

    /// The run is absent and the run gate does not retry absence.
    #[error("run {run} is not yet available (checked {checked_at})")]
    RunNotYetAvailable {
        run: RunIdentifier,
        attempts: u32,
        checked_at: DateTime<Utc>,
    },

    /// The store failed permanently while checking the run.
    #[error("checking run {run} failed after {attempts} attempts: {failure}")]
    RunCheckFailed {
        run: RunIdentifier,
        attempts: u32,
        at: DateTime<Utc>,
        failure: CheckFailure,
    },

    /// Cancelled before the run gate passed.
    #[error("pipeline for run {run} cancelled at {at}")]
    Cancelled { run: RunIdentifier, at: DateTime<Utc> },

    /// Parameters that cannot form a plan.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

impl OrchestratorError {
    /// True when this invocation spent its run retry budget or hit a
    /// permanent error, as opposed to "not yet available, the next trigger
    /// will try again".
    pub fn gave_up(&self) -> bool {
        matches!(
            self,
            Self::RunRetriesExhausted { .. } | Self::RunCheckFailed { .. }
        )
    }

    /// The run the error refers to, when one was resolved.
    pub fn run(&self) -> Option<&RunIdentifier> {
        match self {
            Self::RunRetriesExhausted { run, .. }
            | Self::RunNotYetAvailable { run, .. }
            | Self::RunCheckFailed { run, .. }
            | Self::Cancelled { run, .. } => Some(run),
            Self::InvalidArgument(_) | Self::InvalidPlan(_) => None,
        }
    }

    /// Number of run checks performed before the error.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RunRetriesExhausted { attempts, .. }
            | Self::RunNotYetAvailable { attempts, .. }
            | Self::RunCheckFailed { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Metric label of the invocation outcome.
    pub(crate) fn outcome_label(&self) -> &'static str {
        match self {
            Self::RunRetriesExhausted { .. } | Self::RunNotYetAvailable { .. } => "run_unavailable",
            Self::Cancelled { .. } => "cancelled",
            _ => "error",
        }
    }
}

/// Why a timestep did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Absent, and the timestep check site does not retry absence.
    NotYetAvailable,
    /// Absent for the whole retry budget.
    Exhausted,
    /// The store failed permanently while checking.
    CheckFailed,
    /// The transfer or the local write failed.
    DownloadFailed,
    Cancelled,
    /// The task itself died.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotYetAvailable => "not_yet_available",
            Self::Exhausted => "exhausted",
            Self::CheckFailed => "check_failed",
            Self::DownloadFailed => "download_failed",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

/// Diagnostics of one failed timestep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestepFailure {
    pub kind: FailureKind,
    pub key: String,
    pub message: String,
    /// Availability checks performed for the timestep.
    pub attempts: u32,
    pub at: DateTime<Utc>,
}

impl TimestepFailure {
    pub fn new(kind: FailureKind, key: impl Into<String>, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            key: key.into(),
            message: message.into(),
            attempts,
            at: Utc::now(),
        }
    }
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub request: TimestepRequest,
    pub key: String,
    pub local_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Availability checks performed before the download.
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

/// Terminal state of one timestep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimestepStatus {
    Success(DownloadResult),
    Failed(TimestepFailure),
}

impl TimestepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure(&self) -> Option<&TimestepFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Success(_) => None,
        }
    }

    /// Metric label: "success" or the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failed(failure) => failure.kind.as_str(),
        }
    }
}

/// Aggregate outcome of one invocation whose run gate passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub invocation_id: Uuid,
    pub name: String,
    pub run: RunIdentifier,
    /// Run checks performed by the gate.
    pub run_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub per_timestep: BTreeMap<u32, TimestepStatus>,
}

impl PipelineResult {
    /// True when every timestep was downloaded.
    pub fn is_complete(&self) -> bool {
        self.per_timestep.values().all(TimestepStatus::is_success)
    }

    pub fn succeeded(&self) -> Vec<u32> {
        self.per_timestep
            .iter()
            .filter(|(_, status)| status.is_success())
            .map(|(timestep, _)| *timestep)
            .collect()
    }

    pub fn failed(&self) -> Vec<u32> {
        self.per_timestep
            .iter()
            .filter(|(_, status)| !status.is_success())
            .map(|(timestep, _)| *timestep)
            .collect()
    }

    pub fn status(&self, timestep: u32) -> Option<&TimestepStatus> {
        self.per_timestep.get(&timestep)
    }

    pub(crate) fn outcome_label(&self) -> &'static str {
        if self.is_complete() {
            "complete"
        } else {
            "partial"
        }
    }
}
