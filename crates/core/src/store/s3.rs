//! Anonymous S3 backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::config::StoreConfig;
use super::error::StoreError;
use super::paths::{destination_path, ensure_parent};
use super::traits::{ObjectStore, ObjectSummary};

/// S3 caps `max-keys` at 1000.
const MAX_PAGE_SIZE: usize = 1000;

/// Public bucket accessed without credentials.
///
/// The SDK's own retries are disabled: availability retries belong to the
/// retry policy and a download is a single attempt.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    page_size: usize,
}

impl S3ObjectStore {
    /// Wrap an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Build an unsigned client from configuration.
    pub async fn from_config(config: &StoreConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
                    .build(),
            )
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            page_size: config.list_page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Where the next listing page starts.
enum Cursor {
    Start,
    Next(String),
    Done,
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    fn list<'a>(
        &'a self,
        prefix: &'a str,
        limit: Option<usize>,
    ) -> BoxStream<'a, Result<ObjectSummary, StoreError>> {
        let page_size = limit.map_or(self.page_size, |l| l.clamp(1, self.page_size));

        let pages = stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            debug!(bucket = %self.bucket, prefix, "Listing objects");

            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .max_keys(page_size as i32)
                .set_continuation_token(token)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, prefix))?;

            let next = match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    Cursor::Next(token.to_string())
                }
                _ => Cursor::Done,
            };

            let objects: Vec<ObjectSummary> = response
                .contents()
                .iter()
                .filter_map(|obj| {
                    let key = obj.key()?.to_string();
                    Some(ObjectSummary {
                        key,
                        size_bytes: obj.size().unwrap_or(0).max(0) as u64,
                        last_modified: obj
                            .last_modified()
                            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())),
                    })
                })
                .collect();

            Ok(Some((objects, next)))
        });

        let objects = pages
            .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
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
        let path = destination_path(destination_dir, key, destination_filename)?;
        ensure_parent(&path).await?;

        info!(bucket = %self.bucket, key, path = %path.display(), "Downloading object");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        let mut body = response.body;
        let mut file = File::create(&path)
            .await
            .map_err(|e| StoreError::filesystem(&path, e))?;

        while let Some(chunk) = body.try_next().await.map_err(|e| StoreError::Network {
            key: key.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk)
                .await
                .map_err(|e| StoreError::filesystem(&path, e))?;
        }
        file.flush()
            .await
            .map_err(|e| StoreError::filesystem(&path, e))?;

        Ok(path)
    }
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Network {
                key: key.to_string(),
                message,
            }
        }
        _ => {
            let status = err.raw_response().map(|r| r.status().as_u16());
            classify_response(status, err.code(), key, message)
        }
    }
}

/// Map an HTTP status / S3 error code pair onto the store taxonomy.
fn classify_response(
    status: Option<u16>,
    code: Option<&str>,
    key: &str,
    message: String,
) -> StoreError {
    let key = key.to_string();
    match (status, code) {
        (Some(404), _) | (_, Some("NoSuchKey")) | (_, Some("NotFound")) => {
            StoreError::NotFound { key }
        }
        (Some(403), _) | (_, Some("AccessDenied")) => StoreError::PermissionDenied { key },
        (Some(429), _) | (_, Some("SlowDown")) => StoreError::Network { key, message },
        (Some(status), _) if status >= 500 => StoreError::Network { key, message },
        _ => StoreError::Service { message },
    }
}
