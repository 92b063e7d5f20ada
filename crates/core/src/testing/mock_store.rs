//! Mock object store for testing.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::sync::RwLock;

use crate::store::{destination_path, ensure_dir, ObjectStore, ObjectSummary, StoreError};

/// Tracks how many operations are in flight and the highest count seen.
#[derive(Debug, Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a> {
    gauge: &'a Gauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory implementation of the ObjectStore trait.
///
/// Provides controllable behavior for testing:
/// - Objects that only become visible after a number of listings
/// - One-shot listing and download failures
/// - Simulated latency
/// - Recorded calls and peak concurrency for assertions
///
/// # Example
///
/// ```rust,ignore
/// use nwp_fetch_core::testing::MockObjectStore;
///
/// let store = MockObjectStore::new();
/// store.put_object("gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003", b"grib".to_vec()).await;
///
/// // Hide the run for the first two checks
/// store.set_available_after("gfs.20201215/00/gfs.t00z.pgrb2.0p25", 2).await;
///
/// // ... run the pipeline ...
///
/// assert_eq!(store.download_calls().await.len(), 1);
/// assert!(store.peak_concurrent_downloads() <= 2);
/// ```
#[derive(Debug)]
pub struct MockObjectStore {
    /// Stored objects by key.
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    /// Listings of these exact prefixes come back empty this many more times.
    hidden: Arc<RwLock<HashMap<String, u32>>>,
    /// Prefix of every listing, in call order.
    list_calls: Arc<RwLock<Vec<String>>>,
    /// Key of every download, in call order.
    download_calls: Arc<RwLock<Vec<String>>>,
    /// If set, the next listing fails with this error.
    next_list_error: Arc<RwLock<Option<StoreError>>>,
    /// One-shot listing failures by prefix.
    list_errors: Arc<RwLock<HashMap<String, StoreError>>>,
    /// One-shot download failures by key.
    download_errors: Arc<RwLock<HashMap<String, StoreError>>>,
    /// Simulated latency of a listing.
    list_delay: Arc<RwLock<Duration>>,
    /// Simulated latency of a download.
    download_delay: Arc<RwLock<Duration>>,
    /// Listings and downloads in flight.
    requests: Gauge,
    /// Downloads in flight.
    downloads: Gauge,
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockObjectStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            hidden: Arc::new(RwLock::new(HashMap::new())),
            list_calls: Arc::new(RwLock::new(Vec::new())),
            download_calls: Arc::new(RwLock::new(Vec::new())),
            next_list_error: Arc::new(RwLock::new(None)),
            list_errors: Arc::new(RwLock::new(HashMap::new())),
            download_errors: Arc::new(RwLock::new(HashMap::new())),
            list_delay: Arc::new(RwLock::new(Duration::ZERO)),
            download_delay: Arc::new(RwLock::new(Duration::ZERO)),
            requests: Gauge::default(),
            downloads: Gauge::default(),
        }
    }

    /// Add or replace an object.
    pub async fn put_object(&self, key: impl Into<String>, data: Vec<u8>) {
        self.objects.write().await.insert(key.into(), data);
    }

    /// The first `listings` listings of exactly `prefix` find nothing.
    pub async fn set_available_after(&self, prefix: impl Into<String>, listings: u32) {
        self.hidden.write().await.insert(prefix.into(), listings);
    }

    /// Fail the next listing, whatever its prefix.
    pub async fn fail_next_list(&self, error: StoreError) {
        *self.next_list_error.write().await = Some(error);
    }

    /// Fail the next listing of exactly `prefix`.
    pub async fn fail_list(&self, prefix: impl Into<String>, error: StoreError) {
        self.list_errors.write().await.insert(prefix.into(), error);
    }

    /// Fail the next download of `key`.
    pub async fn fail_download(&self, key: impl Into<String>, error: StoreError) {
        self.download_errors.write().await.insert(key.into(), error);
    }

    /// Set the simulated listing latency.
    pub async fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.write().await = delay;
    }

    /// Set the simulated download latency.
    pub async fn set_download_delay(&self, delay: Duration) {
        *self.download_delay.write().await = delay;
    }

    /// Number of listings performed.
    pub async fn list_calls(&self) -> usize {
        self.list_calls.read().await.len()
    }

    /// Number of listings of exactly `prefix`.
    pub async fn list_calls_for(&self, prefix: &str) -> usize {
        self.list_calls
            .read()
            .await
            .iter()
            .filter(|p| p.as_str() == prefix)
            .count()
    }

    /// Keys downloaded, in call order.
    pub async fn download_calls(&self) -> Vec<String> {
        self.download_calls.read().await.clone()
    }

    /// Highest number of listings and downloads that were in flight at once.
    pub fn peak_concurrent_requests(&self) -> usize {
        self.requests.peak()
    }

    /// Highest number of downloads that were in flight at once.
    pub fn peak_concurrent_downloads(&self) -> usize {
        self.downloads.peak()
    }

    async fn matching(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        let _request = self.requests.enter();
        self.list_calls.write().await.push(prefix.to_string());

        let delay = *self.list_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_list_error.write().await.take() {
            return Err(error);
        }
        if let Some(error) = self.list_errors.write().await.remove(prefix) {
            return Err(error);
        }
        if let Some(remaining) = self.hidden.write().await.get_mut(prefix) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(Vec::new());
            }
        }

        let now = Utc::now();
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, data)| ObjectSummary {
                key: key.clone(),
                size_bytes: data.len() as u64,
                last_modified: Some(now),
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &str {
        "mock"
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<ObjectSummary, StoreError>> {
        let objects = stream::once(self.matching(prefix))
            .map_ok(|found| stream::iter(found.into_iter().map(Ok)))
            .try_flatten();

        match limit {
            Some(limit) => objects.take(limit).boxed(),
            None => objects.boxed(),
        }
    }

    async fn download(
        &self,
        key: &str,
        destination_dir: &Path,
        destination_filename: Option<&str>,
    ) -> Result<PathBuf, StoreError> {
        let _request = self.requests.enter();
        let _download = self.downloads.enter();
        self.download_calls.write().await.push(key.to_string());

        let delay = *self.download_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.download_errors.write().await.remove(key) {
            return Err(error);
        }

        let data = self
            .objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;

        let path = destination_path(destination_dir, key, destination_filename)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::filesystem(&path, e))?;

        Ok(path)
    }
}
