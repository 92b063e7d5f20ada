//! Mock post-processor for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::postprocess::{PostProcessError, PostProcessor};
use crate::run::TimestepRequest;

/// Records every path it is handed.
#[derive(Debug)]
pub struct MockPostProcessor {
    /// Paths processed, in call order.
    processed: Arc<RwLock<Vec<PathBuf>>>,
    /// Whether every call should fail.
    fail: Arc<RwLock<bool>>,
    /// Simulated hook runtime.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPostProcessor {
    pub fn new() -> Self {
        Self {
            processed: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all processed paths.
    pub async fn processed(&self) -> Vec<PathBuf> {
        self.processed.read().await.clone()
    }

    /// Make every following call fail (after recording the path).
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Sleep this long before recording each path.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl PostProcessor for MockPostProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn process(&self, _request: &TimestepRequest, path: &Path) -> Result<(), PostProcessError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.processed.write().await.push(path.to_path_buf());
        if *self.fail.read().await {
            return Err(PostProcessError::Other(format!(
                "mock failure for {}",
                path.display()
            )));
        }
        Ok(())
    }
}
