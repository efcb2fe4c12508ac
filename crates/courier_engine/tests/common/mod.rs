#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use courier_core::{ListingItem, UploadRecord};
use courier_engine::{
    FailureKind, FetchError, Fetcher, ListingSelectors, ListingView, ObjectStore, Payload,
    RevealSettings, SelectorExtractor, StoreError, ViewError,
};

pub const LISTING_URL: &str = "https://listing.test/repository/";

pub fn init_logging() {
    courier_logging::initialize_for_tests();
}

pub fn quick_reveal() -> RevealSettings {
    RevealSettings {
        scroll_step: 500,
        settle_delay: Duration::ZERO,
        final_settle: Duration::ZERO,
        stagnation_threshold: 5,
        max_iterations: 100,
    }
}

pub fn doc_selectors() -> ListingSelectors {
    ListingSelectors {
        item: ".doc".to_string(),
        title: "h3".to_string(),
        author: Some(".author".to_string()),
        tags: Some(".tag".to_string()),
        link: "a[href]".to_string(),
        link_text: Some("Download".to_string()),
    }
}

pub fn doc_extractor() -> Arc<SelectorExtractor> {
    Arc::new(SelectorExtractor::new(&doc_selectors(), Some(LISTING_URL)).unwrap())
}

pub fn doc_html(index: usize) -> String {
    format!(
        r#"<div class="doc"><h3>Doc {index}</h3><span class="author">Author {index}</span><span class="tag">t{index}</span><a href="/files/doc-{index}.pdf">Download</a></div>"#
    )
}

/// Listing that reveals `per_disclosure` more documents per disclosure until `total`.
pub struct FakeView {
    pub total: usize,
    pub per_disclosure: usize,
    pub visible: usize,
    pub disclosures: u32,
    pub disclosable: bool,
    /// Grows forever, ignoring `total`.
    pub endless: bool,
}

impl FakeView {
    pub fn new(total: usize, per_disclosure: usize) -> Self {
        Self {
            total,
            per_disclosure,
            visible: total.min(per_disclosure),
            disclosures: 0,
            disclosable: true,
            endless: false,
        }
    }

    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(0, 1)
        }
    }
}

#[async_trait::async_trait]
impl ListingView for FakeView {
    fn location(&self) -> &str {
        LISTING_URL
    }

    async fn disclose(&mut self, _step: u32) -> Result<(), ViewError> {
        if !self.disclosable {
            return Err(ViewError::DisclosureUnavailable);
        }
        self.disclosures += 1;
        if self.endless {
            self.visible += 1;
        } else {
            self.visible = self.total.min(self.visible + self.per_disclosure);
        }
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String, ViewError> {
        let body: String = (1..=self.visible).map(doc_html).collect();
        Ok(format!("<html><body>{body}</body></html>"))
    }
}

/// Fetcher that fails for selected references and writes the rest to `dir`.
pub struct FakeFetcher {
    pub dir: PathBuf,
    pub failing: HashSet<String>,
    /// Fail this many times before succeeding, per reference.
    pub flaky: Mutex<std::collections::HashMap<String, u32>>,
    pub calls: Mutex<Vec<String>>,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            failing: HashSet::new(),
            flaky: Mutex::new(Default::default()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, reference: &str) -> Self {
        self.failing.insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, item: &ListingItem) -> Result<Payload, FetchError> {
        let reference = item.download_ref.clone().unwrap_or_default();
        self.calls.lock().unwrap().push(reference.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&reference) {
            return Err(FetchError::new(FailureKind::Timeout, "no download within 180s")
                .for_item(item.label()));
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&reference) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::new(FailureKind::Network, "connection reset")
                        .for_item(item.label()));
                }
            }
        }

        let name = item.name_hint().unwrap_or_else(|| "doc.pdf".to_string());
        let path = self.dir.join(&name);
        std::fs::write(&path, format!("%PDF {reference}")).unwrap();
        Ok(Payload::on_disk(path, name))
    }
}

/// Store that records commits and rejects selected keys.
#[derive(Default)]
pub struct RecordingStore {
    pub rejected_keys: HashSet<String>,
    pub commits: Mutex<Vec<(UploadRecord, Bytes)>>,
}

impl RecordingStore {
    pub fn rejecting(key: &str) -> Self {
        let mut store = Self::default();
        store.rejected_keys.insert(key.to_string());
        store
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .commits
            .lock()
            .unwrap()
            .iter()
            .map(|(record, _)| record.key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl ObjectStore for RecordingStore {
    async fn put(&self, record: &UploadRecord, body: Bytes) -> Result<(), StoreError> {
        if self.rejected_keys.contains(&record.key) {
            return Err(StoreError::Rejected {
                status: 503,
                message: "slow down".to_string(),
            });
        }
        self.commits.lock().unwrap().push((record.clone(), body));
        Ok(())
    }
}
