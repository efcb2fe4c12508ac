use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{ListingItem, UploadRecord};
use courier_logging::{courier_debug, courier_error, courier_info, courier_warn};

use crate::store::ObjectStore;
use crate::{Payload, PayloadBody, UploadOutcome};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Pause after every attempt to stay under the store's request-rate ceiling.
    /// Shared by all workers: store writes are at least this far apart overall.
    pub inter_upload_delay: Duration,
    /// Recorded as `sourcePage` on every object.
    pub source_page: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            inter_upload_delay: Duration::from_secs(1),
            source_page: String::new(),
        }
    }
}

/// Commits payloads to an [`ObjectStore`].
///
/// The local copy of a payload is deleted only after a successful commit; after a
/// failure it stays on disk for manual recovery. Writes go to the store one at a
/// time, each followed by the inter-upload delay, however many workers share it.
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    settings: UploadSettings,
    gate: tokio::sync::Mutex<()>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, settings: UploadSettings) -> Self {
        Self {
            store,
            settings,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn upload(&self, payload: Payload, item: &ListingItem) -> UploadOutcome {
        let record = UploadRecord::for_item(item, &payload.suggested_name, &self.settings.source_page);
        let _turn = self.gate.lock().await;
        let outcome = self.commit(&payload, &record).await;

        match &outcome {
            UploadOutcome::Committed { key } | UploadOutcome::AlreadyPresent { key } => {
                courier_info!("Uploaded {} as {}", item.label(), key);
                release(&payload).await;
            }
            UploadOutcome::Failed { key, reason } => {
                courier_error!("Upload of {} as {} failed: {}", item.label(), key, reason);
                if let Some(path) = payload.local_path() {
                    courier_warn!("Keeping local copy at {:?}", path);
                }
            }
        }

        tokio::time::sleep(self.settings.inter_upload_delay).await;
        outcome
    }

    async fn commit(&self, payload: &Payload, record: &UploadRecord) -> UploadOutcome {
        let body = match &payload.body {
            PayloadBody::Bytes(bytes) => bytes.clone(),
            PayloadBody::File(path) => match tokio::fs::read(path).await {
                Ok(content) => Bytes::from(content),
                Err(err) => {
                    return UploadOutcome::Failed {
                        key: record.key.clone(),
                        reason: format!("could not read {path:?}: {err}"),
                    }
                }
            },
        };

        match self.store.put(record, body).await {
            Ok(()) => UploadOutcome::Committed {
                key: record.key.clone(),
            },
            Err(err) => UploadOutcome::Failed {
                key: record.key.clone(),
                reason: err.to_string(),
            },
        }
    }
}

async fn release(payload: &Payload) {
    let Some(path) = payload.local_path() else {
        return;
    };
    match tokio::fs::remove_file(path).await {
        Ok(()) => courier_debug!("Removed local copy {:?}", path),
        Err(err) => courier_warn!("Could not remove local copy {:?}: {}", path, err),
    }
}
