//! Dependency-gated, bounded-concurrency download pipeline.
//!
//! An invocation follows a strict order:
//! - **Gate**: the run must exist before any timestep is looked at
//! - **Timesteps**: each one is checked, then downloaded, independently of
//!   its siblings; failures are recorded per timestep
//! - **Aggregate**: a `PipelineResult` once every timestep is terminal

mod config;
mod plan;
mod runner;
mod types;

pub use config::DownloadConfig;
pub use plan::{PipelinePlan, RunParameters};
pub use runner::DownloadOrchestrator;
pub use types::{
    DownloadResult, FailureKind, OrchestratorError, PipelineResult, TimestepFailure,
    TimestepStatus,
};
