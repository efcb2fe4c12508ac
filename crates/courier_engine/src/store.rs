use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use courier_core::UploadRecord;
use courier_logging::{courier_debug, courier_warn};
use serde_json::json;
use url::Url;

use crate::filename::short_hash;
use crate::object_dir::{ObjectDir, ObjectDirError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store configuration error: {0}")]
    Configuration(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("store rejected write with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("store transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    ObjectDir(#[from] ObjectDirError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable destination for committed documents. Only writes are needed.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Checked once before any listing work; a `Configuration` error aborts the run.
    async fn preflight(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Full-content overwrite of the object at `record.key`.
    async fn put(&self, record: &UploadRecord, body: Bytes) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct GcsSettings {
    pub bucket: String,
    pub endpoint: String,
    pub access_token: String,
    pub request_timeout: Duration,
}

impl GcsSettings {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: "https://storage.googleapis.com".to_string(),
            access_token: access_token.into(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Google Cloud Storage through the JSON API's multipart upload.
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: reqwest::Client,
    bucket_url: Url,
    upload_url: Url,
    access_token: String,
}

impl GcsStore {
    pub fn new(settings: GcsSettings) -> Result<Self, StoreError> {
        if settings.bucket.trim().is_empty() {
            return Err(StoreError::Configuration("bucket name is empty".into()));
        }
        if settings.access_token.trim().is_empty() {
            return Err(StoreError::Configuration("access token is missing".into()));
        }
        let endpoint = Url::parse(&settings.endpoint)
            .map_err(|err| StoreError::Configuration(format!("endpoint: {err}")))?;
        let bucket = settings.bucket.trim();
        let bucket_url = with_segments(&endpoint, &["storage", "v1", "b", bucket])?;
        let mut upload_url = with_segments(&endpoint, &["upload", "storage", "v1", "b", bucket, "o"])?;
        upload_url
            .query_pairs_mut()
            .append_pair("uploadType", "multipart");

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| StoreError::Configuration(err.to_string()))?;

        Ok(Self {
            client,
            bucket_url,
            upload_url,
            access_token: settings.access_token,
        })
    }
}

fn with_segments(endpoint: &Url, segments: &[&str]) -> Result<Url, StoreError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Configuration("endpoint cannot be a base url".into()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait::async_trait]
impl ObjectStore for GcsStore {
    /// Reads the bucket resource. Unreachable endpoints, unknown buckets and rejected
    /// tokens are fatal; a token that may write but not read bucket metadata is not.
    async fn preflight(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .get(self.bucket_url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| StoreError::Configuration(format!("store unreachable: {err}")))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(StoreError::Configuration(format!(
                "bucket not found at {}",
                self.bucket_url
            ))),
            reqwest::StatusCode::UNAUTHORIZED => {
                Err(StoreError::Configuration("access token rejected".into()))
            }
            status => {
                courier_warn!("Bucket check returned {}; continuing", status);
                Ok(())
            }
        }
    }

    async fn put(&self, record: &UploadRecord, body: Bytes) -> Result<(), StoreError> {
        let resource = json!({
            "name": record.key,
            "contentType": record.content_type,
            "metadata": record.metadata,
        });
        let boundary = format!("courier-{}-{}", short_hash(&body), body.len());
        let multipart = multipart_related(&boundary, &serde_json::to_vec(&resource)?, record.content_type, &body);

        let response = self
            .client
            .post(self.upload_url.clone())
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(multipart)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message: message.chars().take(512).collect(),
            });
        }
        courier_debug!("GCS accepted {} ({} bytes)", record.key, body.len());
        Ok(())
    }
}

fn multipart_related(boundary: &str, resource: &[u8], content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + resource.len() + 256);
    out.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    out.extend_from_slice(resource);
    out.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    out
}

/// Stores objects as files in a directory, with a `<key>.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    dir: ObjectDir,
}

impl LocalDirStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        let dir = ObjectDir::open(root).map_err(|err| StoreError::Configuration(err.to_string()))?;
        Ok(Self { dir })
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalDirStore {
    async fn put(&self, record: &UploadRecord, body: Bytes) -> Result<(), StoreError> {
        if record.key.is_empty()
            || record.key.contains(['/', '\\'])
            || matches!(record.key.as_str(), "." | "..")
        {
            return Err(StoreError::InvalidKey(record.key.clone()));
        }
        let sidecar = serde_json::to_vec_pretty(&json!({
            "contentType": record.content_type,
            "metadata": record.metadata,
        }))?;
        let dir = self.dir.clone();
        let key = record.key.clone();
        let path = tokio::task::spawn_blocking(move || dir.commit(&key, &body, &sidecar))
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))??;
        courier_debug!("Stored {} at {:?}", record.key, path);
        Ok(())
    }
}
