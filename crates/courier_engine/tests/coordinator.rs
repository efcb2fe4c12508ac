mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{ListingItem, RunStats};
use courier_engine::{
    Coordinator, Fetcher, ListingExtractor, ListingView, RevealSettings, Revealer, RunError,
    RunSettings, UploadSettings, Uploader, ViewError,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::{
    doc_extractor, init_logging, quick_reveal, FakeFetcher, FakeView, RecordingStore, LISTING_URL,
};

struct Harness {
    dir: TempDir,
    store: Arc<RecordingStore>,
}

impl Harness {
    fn new(store: RecordingStore) -> Self {
        init_logging();
        Self {
            dir: TempDir::new().unwrap(),
            store: Arc::new(store),
        }
    }

    fn coordinator(&self, fetcher: Arc<dyn Fetcher>, settings: RunSettings) -> Coordinator {
        self.coordinator_with(fetcher, settings, doc_extractor())
    }

    fn coordinator_with(
        &self,
        fetcher: Arc<dyn Fetcher>,
        settings: RunSettings,
        extractor: Arc<dyn ListingExtractor>,
    ) -> Coordinator {
        let uploader = Uploader::new(
            self.store.clone(),
            UploadSettings {
                inter_upload_delay: Duration::ZERO,
                source_page: LISTING_URL.to_string(),
            },
        );
        Coordinator::new(
            Revealer::new(quick_reveal(), extractor),
            fetcher,
            Arc::new(uploader),
            settings,
        )
    }

    fn fetcher(&self) -> FakeFetcher {
        FakeFetcher::new(self.dir.path().to_path_buf())
    }

    fn local_file(&self, index: usize) -> std::path::PathBuf {
        self.dir.path().join(format!("doc-{index}.pdf"))
    }
}

fn doc_ref(index: usize) -> String {
    format!("https://listing.test/files/doc-{index}.pdf")
}

fn stats(processed: u64, uploaded: u64, failed: u64) -> RunStats {
    RunStats {
        processed,
        uploaded,
        failed,
    }
}

#[tokio::test]
async fn empty_listing_yields_zero_stats() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = Arc::new(harness.fetcher());
    let coordinator = harness.coordinator(fetcher.clone(), RunSettings::default());

    let result = coordinator
        .run(&mut FakeView::new(0, 3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(0, 0, 0));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn all_items_succeed() {
    let harness = Harness::new(RecordingStore::default());
    let coordinator = harness.coordinator(Arc::new(harness.fetcher()), RunSettings::default());

    let result = coordinator
        .run(&mut FakeView::new(3, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(3, 3, 0));
    assert_eq!(
        harness.store.keys(),
        vec!["Doc_1.pdf", "Doc_2.pdf", "Doc_3.pdf"]
    );
}

#[tokio::test]
async fn fetch_timeout_on_one_item_does_not_stop_the_next() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = Arc::new(harness.fetcher().failing_on(&doc_ref(2)));
    let coordinator = harness.coordinator(
        fetcher.clone(),
        RunSettings {
            concurrency: 1,
            ..RunSettings::default()
        },
    );

    let result = coordinator
        .run(&mut FakeView::new(3, 3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(3, 2, 1));
    assert_eq!(fetcher.calls(), vec![doc_ref(1), doc_ref(2), doc_ref(3)]);
    assert_eq!(harness.store.keys(), vec!["Doc_1.pdf", "Doc_3.pdf"]);
}

#[tokio::test]
async fn rejected_write_keeps_only_that_local_copy() {
    let harness = Harness::new(RecordingStore::rejecting("Doc_2.pdf"));
    let coordinator = harness.coordinator(Arc::new(harness.fetcher()), RunSettings::default());

    let result = coordinator
        .run(&mut FakeView::new(3, 2), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(3, 2, 1));
    assert!(!harness.local_file(1).exists());
    assert!(harness.local_file(2).exists());
    assert!(!harness.local_file(3).exists());
}

#[tokio::test]
async fn counters_balance_under_concurrency() {
    let harness = Harness::new(RecordingStore::rejecting("Doc_7.pdf"));
    let mut fetcher = harness.fetcher();
    fetcher.delay = Duration::from_millis(5);
    let fetcher = Arc::new(
        fetcher
            .failing_on(&doc_ref(3))
            .failing_on(&doc_ref(11)),
    );
    let coordinator = harness.coordinator(
        fetcher.clone(),
        RunSettings {
            concurrency: 4,
            ..RunSettings::default()
        },
    );

    let result = coordinator
        .run(&mut FakeView::new(20, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(20, 17, 3));
    assert!(result.is_balanced());
    let max = fetcher
        .max_in_flight
        .load(std::sync::atomic::Ordering::SeqCst);
    assert!(max <= 4, "ceiling exceeded: {max}");
    let distinct: HashSet<String> = fetcher.calls().into_iter().collect();
    assert_eq!(distinct.len(), 20);
}

#[tokio::test]
async fn bounded_retry_recovers_flaky_fetches() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = harness.fetcher();
    fetcher.flaky.lock().unwrap().insert(doc_ref(1), 1);
    fetcher.flaky.lock().unwrap().insert(doc_ref(2), 5);
    let fetcher = Arc::new(fetcher);
    let coordinator = harness.coordinator(
        fetcher.clone(),
        RunSettings {
            concurrency: 1,
            fetch_attempts: 2,
            retry_delay: Duration::ZERO,
        },
    );

    let result = coordinator
        .run(&mut FakeView::new(2, 2), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(2, 1, 1));
    assert_eq!(fetcher.calls().len(), 4);
}

#[tokio::test]
async fn cancelled_run_starts_nothing() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = Arc::new(harness.fetcher());
    let coordinator = harness.coordinator(fetcher.clone(), RunSettings::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = coordinator
        .run(&mut FakeView::new(5, 5), &cancel)
        .await
        .unwrap();

    assert_eq!(result, stats(0, 0, 0));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn listing_without_disclosure_aborts_before_iteration() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = Arc::new(harness.fetcher());
    let coordinator = harness.coordinator(fetcher.clone(), RunSettings::default());
    let mut view = FakeView::new(3, 1);
    view.disclosable = false;

    let err = coordinator
        .run(&mut view, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Configuration(_)));
    assert!(fetcher.calls().is_empty());
}

/// Extractor returning a fixed set of items regardless of markup.
struct FixedItems(Vec<ListingItem>);

impl ListingExtractor for FixedItems {
    fn extract(&self, _html: &str) -> Vec<ListingItem> {
        self.0.clone()
    }
}

struct StaticView;

#[async_trait]
impl ListingView for StaticView {
    fn location(&self) -> &str {
        LISTING_URL
    }

    async fn disclose(&mut self, _step: u32) -> Result<(), ViewError> {
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String, ViewError> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn incomplete_entries_are_skipped_without_counting() {
    let harness = Harness::new(RecordingStore::default());
    let fetcher = Arc::new(harness.fetcher());
    let items = vec![
        ListingItem::new("No link", None),
        ListingItem::new("", Some("https://listing.test/files/".to_string())),
        ListingItem::new("Kept", Some(doc_ref(9))),
    ];
    let coordinator = harness.coordinator_with(
        fetcher.clone(),
        RunSettings::default(),
        Arc::new(FixedItems(items)),
    );

    let result = coordinator
        .run(&mut StaticView, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(1, 1, 0));
    assert_eq!(fetcher.calls(), vec![doc_ref(9)]);
}

#[tokio::test]
async fn reveal_settings_bound_discovery_before_iteration() {
    let harness = Harness::new(RecordingStore::default());
    let uploader = Uploader::new(
        harness.store.clone(),
        UploadSettings {
            inter_upload_delay: Duration::ZERO,
            source_page: String::new(),
        },
    );
    let coordinator = Coordinator::new(
        Revealer::new(
            RevealSettings {
                max_iterations: 3,
                ..quick_reveal()
            },
            doc_extractor(),
        ),
        Arc::new(harness.fetcher()),
        Arc::new(uploader),
        RunSettings::default(),
    );

    let result = coordinator
        .run(&mut FakeView::endless(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, stats(3, 3, 0));
}
