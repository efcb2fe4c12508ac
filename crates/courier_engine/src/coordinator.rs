use std::sync::Arc;
use std::time::Duration;

use courier_core::{ItemOutcome, ListingItem, RunPhase, RunStats};
use courier_logging::{courier_debug, courier_error, courier_info, courier_warn};
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::reveal::{RevealError, Revealer};
use crate::upload::Uploader;
use crate::view::ListingView;
use crate::{Fetcher, UploadOutcome};

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Ceiling on concurrently in-flight fetch+upload sequences.
    pub concurrency: usize,
    /// 1 means a single attempt per item.
    pub fetch_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            fetch_attempts: 1,
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Discovery(RevealError),
}

impl From<RevealError> for RunError {
    fn from(err: RevealError) -> Self {
        match err {
            RevealError::DisclosureUnavailable => {
                RunError::Configuration(RevealError::DisclosureUnavailable.to_string())
            }
            other => RunError::Discovery(other),
        }
    }
}

/// Reveals the listing once, then pushes every actionable item through fetch and upload.
pub struct Coordinator {
    revealer: Revealer,
    fetcher: Arc<dyn Fetcher>,
    uploader: Arc<Uploader>,
    settings: RunSettings,
}

impl Coordinator {
    pub fn new(
        revealer: Revealer,
        fetcher: Arc<dyn Fetcher>,
        uploader: Arc<Uploader>,
        settings: RunSettings,
    ) -> Self {
        Self {
            revealer,
            fetcher,
            uploader,
            settings,
        }
    }

    /// Runs to completion or until `cancel` fires. Cancellation stops new items from
    /// starting; items already in flight finish and are counted.
    pub async fn run(
        &self,
        view: &mut dyn ListingView,
        cancel: &CancellationToken,
    ) -> Result<RunStats, RunError> {
        let mut phase = RunPhase::Init;
        phase = self.enter(phase);

        let report = self.revealer.reveal(view).await?;
        phase = self.enter(phase);

        let concurrency = self.settings.concurrency.max(1);
        let stats = stream::iter(report.items)
            .filter(|item| future::ready(keep_actionable(item)))
            .take_until(cancel.cancelled())
            .map(|item| self.process(item))
            .buffer_unordered(concurrency)
            .fold(RunStats::new(), |mut stats, outcome| {
                stats.record(outcome);
                future::ready(stats)
            })
            .await;

        if cancel.is_cancelled() {
            courier_warn!("Run cancelled; remaining items were not started");
        }
        self.enter(phase);
        courier_info!("Run finished: {}", stats);
        Ok(stats)
    }

    fn enter(&self, phase: RunPhase) -> RunPhase {
        let next = phase.advance().unwrap_or(phase);
        courier_debug!("Run phase {:?} -> {:?}", phase, next);
        next
    }

    async fn process(&self, item: ListingItem) -> ItemOutcome {
        let attempts = self.settings.fetch_attempts.max(1);
        let mut attempt = 1;
        let payload = loop {
            match self.fetcher.fetch(&item).await {
                Ok(payload) => break payload,
                Err(err) if attempt < attempts => {
                    courier_warn!(
                        "Fetch attempt {}/{} failed for {}: {}; retrying",
                        attempt,
                        attempts,
                        item.label(),
                        err
                    );
                    attempt += 1;
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(err) => {
                    courier_error!("Fetch failed for {}: {}", item.label(), err);
                    return ItemOutcome::Failed;
                }
            }
        };

        match self.uploader.upload(payload, &item).await {
            UploadOutcome::Committed { .. } | UploadOutcome::AlreadyPresent { .. } => {
                ItemOutcome::Uploaded
            }
            UploadOutcome::Failed { .. } => ItemOutcome::Failed,
        }
    }
}

fn keep_actionable(item: &ListingItem) -> bool {
    let actionable = item.is_actionable();
    if !actionable {
        courier_debug!("Skipping incomplete listing entry {:?}", item.label());
    }
    actionable
}
