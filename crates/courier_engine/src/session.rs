use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use courier_core::ListingItem;
use courier_logging::{courier_debug, courier_error, courier_warn};
use tokio::sync::Mutex;

use crate::{FailureKind, FetchError, Fetcher, Payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub suggested_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("download failed: {0}")]
    Download(String),
}

/// A scripted browser page that can follow a download link and intercept the file.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    async fn current_location(&self) -> Result<String, SessionError>;
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;
    /// Resolves once the intercepted download has completed on disk.
    async fn await_download(&mut self) -> Result<DownloadedFile, SessionError>;
    async fn restore(&mut self, location: &str) -> Result<(), SessionError>;
}

/// Fetches through a single shared browser page.
///
/// The page is held for the whole attempt, so fetches through one session are
/// serialized whatever the run's concurrency. After an attempt the page is put back
/// on the listing, so a broken navigation never leaks into the next item.
pub struct SessionFetcher<S> {
    session: Arc<Mutex<S>>,
    timeout: Duration,
}

impl<S: BrowserSession> SessionFetcher<S> {
    pub fn new(session: Arc<Mutex<S>>, timeout: Duration) -> Self {
        Self { session, timeout }
    }
}

#[async_trait::async_trait]
impl<S: BrowserSession + 'static> Fetcher for SessionFetcher<S> {
    async fn fetch(&self, item: &ListingItem) -> Result<Payload, FetchError> {
        let label = item.label();
        let Some(url) = item.download_ref.as_deref() else {
            return Err(
                FetchError::new(FailureKind::MissingReference, "item has no download link")
                    .for_item(label),
            );
        };

        let mut session = self.session.lock().await;
        let origin = session
            .current_location()
            .await
            .map_err(|err| FetchError::new(FailureKind::Navigation, err.to_string()).for_item(&label))?;

        let attempt = tokio::time::timeout(self.timeout, async {
            session.navigate(url).await?;
            session.await_download().await
        })
        .await;

        let error = match attempt {
            Ok(Ok(file)) => {
                courier_debug!("Session downloaded {:?} for {}", file.path, label);
                let moved = match session.current_location().await {
                    Ok(location) => location != origin,
                    Err(_) => true,
                };
                if moved {
                    if let Err(err) = session.restore(&origin).await {
                        courier_warn!("Could not return to listing after {}: {}", label, err);
                    }
                }
                return Ok(Payload::on_disk(file.path, file.suggested_name));
            }
            Ok(Err(SessionError::Navigation(message))) => {
                FetchError::new(FailureKind::Navigation, message)
            }
            Ok(Err(SessionError::Download(message))) => {
                FetchError::new(FailureKind::Network, message)
            }
            Err(_) => FetchError::new(
                FailureKind::Timeout,
                format!("no download within {:?}", self.timeout),
            ),
        };

        if let Err(err) = session.restore(&origin).await {
            courier_error!("Could not restore listing view after failed fetch of {}: {}", label, err);
        }
        Err(error.for_item(label))
    }
}
