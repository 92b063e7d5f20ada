//! Post-processor trait definition.

use std::path::Path;

use async_trait::async_trait;

use super::error::PostProcessError;
use crate::run::TimestepRequest;

/// Hook run after each successful timestep download.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    /// Hook name for logging and metrics.
    fn name(&self) -> &str;

    /// Process the file downloaded for `request` at `path`.
    async fn process(&self, request: &TimestepRequest, path: &Path) -> Result<(), PostProcessError>;
}
