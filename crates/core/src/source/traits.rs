//! Forecast source trait definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::availability::{AbsentPolicy, CheckOutcome};
use crate::run::{RunIdentifier, TimestepRequest};
use crate::store::StoreError;

/// A model whose output can be checked for and fetched.
///
/// Checks perform exactly one store call and never retry; retrying is the
/// caller's concern through `RetryPolicy`.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Prefix shared by every object of a run.
    fn run_prefix(&self, run: &RunIdentifier) -> String;

    /// Key of one timestep's object.
    fn timestep_key(&self, request: &TimestepRequest) -> String;

    /// Has any output of the run been published?
    async fn check_run(&self, run: &RunIdentifier, on_absent: AbsentPolicy) -> CheckOutcome;

    /// Has the timestep's object been published?
    async fn check_timestep(&self, request: &TimestepRequest, on_absent: AbsentPolicy) -> CheckOutcome;

    /// Download a timestep into `destination_dir`, mirroring the key's
    /// directory structure. Returns the local path.
    async fn download(
        &self,
        request: &TimestepRequest,
        destination_dir: &Path,
    ) -> Result<PathBuf, StoreError>;
}
