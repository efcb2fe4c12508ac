use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use courier_engine::{
    Coordinator, GcsStore, HttpFetcher, HttpListingView, LocalDirStore, ObjectStore, Revealer,
    SelectorExtractor, Uploader,
};
use courier_logging::{courier_info, courier_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::{Config, StoreConfig};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    let started = Utc::now();
    courier_info!("Run started at {} for {}", started.to_rfc3339(), config.listing.url);

    let extractor = Arc::new(
        SelectorExtractor::new(&config.selectors(), Some(&config.listing.url))
            .context("listing selectors")?,
    );
    let revealer = Revealer::new(config.reveal_settings(), extractor);

    if cli.dry_run {
        let mut view = HttpListingView::open(config.listing_settings()).await?;
        let report = revealer.reveal(&mut view).await?;
        for item in &report.items {
            courier_info!(
                "{} | {} | {}",
                item.label(),
                item.author_line.as_deref().unwrap_or("-"),
                item.download_ref.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    // Store problems are fatal before any listing work starts.
    let store = build_store(&config.store)?;
    store.preflight().await.context("object store")?;
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_settings()).context("http client")?);
    let uploader = Arc::new(Uploader::new(store, config.upload_settings()));
    let coordinator = Coordinator::new(revealer, fetcher, uploader, config.run_settings());

    let cancel = CancellationToken::new();
    spawn_stop_triggers(&cancel, config.run.timeout_secs.map(Duration::from_secs));

    let mut view = HttpListingView::open(config.listing_settings()).await?;
    let stats = coordinator.run(&mut view, &cancel).await?;
    cancel.cancel();

    let elapsed = Utc::now() - started;
    courier_info!(
        "Processed {} documents: {} uploaded, {} failed in {}s",
        stats.processed,
        stats.uploaded,
        stats.failed,
        elapsed.num_seconds()
    );
    Ok(())
}

fn build_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config {
        StoreConfig::Gcs {
            bucket,
            endpoint,
            token_env,
        } => {
            let settings =
                Config::gcs_settings(bucket, endpoint, token_env, |name| std::env::var(name).ok())?;
            courier_info!("Delivering to gs://{}", bucket);
            Arc::new(GcsStore::new(settings)?)
        }
        StoreConfig::LocalDir { path } => {
            courier_info!("Delivering to directory {:?}", path);
            Arc::new(LocalDirStore::new(path.clone())?)
        }
    };
    Ok(store)
}

/// Ctrl-C and the optional run timeout both stop new items from starting.
fn spawn_stop_triggers(cancel: &CancellationToken, timeout: Option<Duration>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    courier_warn!("Interrupted; letting in-flight documents finish");
                    token.cancel();
                }
            }
        }
    });

    if let Some(limit) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    courier_warn!("Run timeout of {:?} reached; no new documents will start", limit);
                    token.cancel();
                }
            }
        });
    }
}
