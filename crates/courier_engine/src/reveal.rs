use std::sync::Arc;
use std::time::Duration;

use courier_core::{ListingItem, StagnationTracker, Step};
use courier_logging::{courier_debug, courier_info, courier_warn};

use crate::extract::ListingExtractor;
use crate::view::{ListingView, ViewError};

#[derive(Debug, Clone)]
pub struct RevealSettings {
    pub scroll_step: u32,
    pub settle_delay: Duration,
    pub final_settle: Duration,
    pub stagnation_threshold: u32,
    pub max_iterations: u32,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            scroll_step: 1000,
            settle_delay: Duration::from_millis(1500),
            final_settle: Duration::from_secs(3),
            stagnation_threshold: 5,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealReport {
    pub items: Vec<ListingItem>,
    pub iterations: u32,
    /// False when the iteration cap stopped disclosure before the listing settled.
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevealError {
    #[error("listing view has no disclosure mechanism")]
    DisclosureUnavailable,
    #[error("listing could not be read: {0}")]
    Unreadable(ViewError),
}

/// Drives progressive disclosure until the entry count stops growing.
pub struct Revealer {
    settings: RevealSettings,
    extractor: Arc<dyn ListingExtractor>,
}

impl Revealer {
    pub fn new(settings: RevealSettings, extractor: Arc<dyn ListingExtractor>) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    /// Consumes the view's disclosure state; hand in a fresh view to reveal again.
    pub async fn reveal(&self, view: &mut dyn ListingView) -> Result<RevealReport, RevealError> {
        let initial = view.snapshot().await.map_err(RevealError::Unreadable)?;
        let mut tracker = StagnationTracker::new(
            self.settings.stagnation_threshold,
            self.settings.max_iterations,
            self.extractor.count(&initial),
        );
        courier_debug!(
            "Revealing {} starting from {} entries",
            view.location(),
            tracker.last_count()
        );

        let mut step = if tracker.can_disclose() {
            Step::Continue
        } else {
            Step::CapReached
        };
        while step == Step::Continue {
            match view.disclose(self.settings.scroll_step).await {
                Ok(()) => {}
                Err(ViewError::DisclosureUnavailable) => {
                    return Err(RevealError::DisclosureUnavailable)
                }
                Err(err) => courier_warn!("Disclosure attempt failed: {}", err),
            }
            tokio::time::sleep(self.settings.settle_delay).await;

            let count = match view.snapshot().await {
                Ok(html) => self.extractor.count(&html),
                Err(err) => {
                    courier_warn!("Could not read listing after disclosure: {}", err);
                    tracker.last_count()
                }
            };
            step = tracker.observe(count);
            courier_debug!(
                "Disclosure {}: {} entries ({:?})",
                tracker.iterations(),
                count,
                step
            );
        }

        let settled = step == Step::Settled;
        if !settled {
            courier_warn!(
                "Discovery stalled: listing still changing after {} disclosures; continuing with what was found",
                tracker.iterations()
            );
        }

        tokio::time::sleep(self.settings.final_settle).await;
        let html = view.snapshot().await.map_err(RevealError::Unreadable)?;
        let items = self.extractor.extract(&html);
        courier_info!(
            "Found {} documents on {} after {} disclosures",
            items.len(),
            view.location(),
            tracker.iterations()
        );

        Ok(RevealReport {
            items,
            iterations: tracker.iterations(),
            settled,
        })
    }
}
