use std::path::PathBuf;
use std::time::Duration;

use courier_core::ListingItem;
use courier_logging::courier_debug;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tokio::io::AsyncWriteExt;

use crate::filename::suggested_filename;
use crate::{FailureKind, FetchError, Payload};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Whole-item bound, body included.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Empty accepts any content type.
    pub allowed_content_types: Vec<String>,
    pub download_dir: PathBuf,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(180),
            redirect_limit: 10,
            max_bytes: 512 * 1024 * 1024,
            allowed_content_types: vec![
                "application/pdf".to_string(),
                "application/x-pdf".to_string(),
                "application/octet-stream".to_string(),
                "binary/octet-stream".to_string(),
            ],
            download_dir: std::env::temp_dir().join("courier-downloads"),
        }
    }
}

/// Resolves one item's download reference to a payload. One attempt per call.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, item: &ListingItem) -> Result<Payload, FetchError>;
}

/// Downloads over plain HTTP into a transient file under `download_dir`.
///
/// Every request is independent, so concurrent fetches never share navigation state.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.settings.allowed_content_types.is_empty() {
            return true;
        }
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    async fn download(&self, url: &str) -> Result<Payload, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, content_len));
            }
        }

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let suggested_name = suggested_filename(disposition.as_deref(), response.url().as_str());

        tokio::fs::create_dir_all(&self.settings.download_dir)
            .await
            .map_err(io_error)?;
        // Dropped (and deleted) on any early return below.
        let partial = tempfile::Builder::new()
            .prefix("courier-")
            .suffix(&format!("-{suggested_name}"))
            .tempfile_in(&self.settings.download_dir)
            .map_err(io_error)?;
        let mut file = tokio::fs::File::from_std(partial.as_file().try_clone().map_err(io_error)?);

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            written += chunk.len() as u64;
            if written > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, written));
            }
            file.write_all(&chunk).await.map_err(io_error)?;
        }
        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        let (_, path) = partial.keep().map_err(|err| io_error(err.error))?;
        courier_debug!("Downloaded {} bytes from {} to {:?}", written, url, path);
        Ok(Payload::on_disk(path, suggested_name))
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, item: &ListingItem) -> Result<Payload, FetchError> {
        let Some(url) = item.download_ref.as_deref() else {
            return Err(
                FetchError::new(FailureKind::MissingReference, "item has no download link")
                    .for_item(item.label()),
            );
        };
        self.download(url)
            .await
            .map_err(|err| err.for_item(item.label()))
    }
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn io_error(err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
