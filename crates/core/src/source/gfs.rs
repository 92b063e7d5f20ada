//! GFS forecast source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::keys::KeyScheme;
use super::traits::ForecastSource;
use crate::availability::{AbsentPolicy, AvailabilityChecker, CheckOutcome};
use crate::run::{RunIdentifier, TimestepRequest};
use crate::store::{ObjectStore, StoreError};

/// GFS output stored under the NOAA open-data layout.
pub struct GfsSource {
    scheme: KeyScheme,
    store: Arc<dyn ObjectStore>,
    checker: AvailabilityChecker,
}

impl GfsSource {
    pub fn new(scheme: KeyScheme, store: Arc<dyn ObjectStore>) -> Self {
        let checker = AvailabilityChecker::new(Arc::clone(&store));
        Self {
            scheme,
            store,
            checker,
        }
    }
}

#[async_trait]
impl ForecastSource for GfsSource {
    fn name(&self) -> &str {
        "gfs"
    }

    fn run_prefix(&self, run: &RunIdentifier) -> String {
        self.scheme.run_prefix(run)
    }

    fn timestep_key(&self, request: &TimestepRequest) -> String {
        self.scheme.timestep_key(request)
    }

    async fn check_run(&self, run: &RunIdentifier, on_absent: AbsentPolicy) -> CheckOutcome {
        let prefix = self.scheme.run_prefix(run);
        debug!(run = %run, store = self.store.name(), "Checking run");
        self.checker.check(&prefix, on_absent).await
    }

    async fn check_timestep(&self, request: &TimestepRequest, on_absent: AbsentPolicy) -> CheckOutcome {
        let key = self.scheme.timestep_key(request);
        debug!(run = %request.run, timestep = request.timestep, "Checking timestep");
        self.checker.check(&key, on_absent).await
    }

    async fn download(
        &self,
        request: &TimestepRequest,
        destination_dir: &Path,
    ) -> Result<PathBuf, StoreError> {
        let key = self.scheme.timestep_key(request);
        self.store.download(&key, destination_dir, None).await
    }
}
