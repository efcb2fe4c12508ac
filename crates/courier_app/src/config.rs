//! RON configuration for a courier run.
//!
//! Everything except `listing.url` and `store` has a default; durations are in
//! milliseconds (or seconds where the name says so).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use courier_engine::{
    FetchSettings, GcsSettings, HttpListingSettings, ListingSelectors, RevealSettings, RunSettings,
    UploadSettings,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listing: ListingConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub run: RunConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub url: String,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default = "default_listing_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub item: String,
    pub title: String,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub link: String,
    pub link_text: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let defaults = ListingSelectors::default();
        Self {
            item: defaults.item,
            title: defaults.title,
            author: defaults.author,
            tags: defaults.tags,
            link: defaults.link,
            link_text: defaults.link_text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub scroll_step: u32,
    pub settle_ms: u64,
    pub final_settle_ms: u64,
    pub stagnation_threshold: u32,
    pub max_iterations: u32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        let defaults = RevealSettings::default();
        Self {
            scroll_step: defaults.scroll_step,
            settle_ms: millis(defaults.settle_delay),
            final_settle_ms: millis(defaults.final_settle),
            stagnation_threshold: defaults.stagnation_threshold,
            max_iterations: defaults.max_iterations,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub download_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            timeout_secs: defaults.request_timeout.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
            allowed_content_types: defaults.allowed_content_types,
            download_dir: defaults.download_dir,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub delay_ms: u64,
    /// Overrides the listing URL as the `sourcePage` metadata value.
    pub source_page: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            delay_ms: millis(UploadSettings::default().inter_upload_delay),
            source_page: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub concurrency: usize,
    pub fetch_attempts: u32,
    pub retry_delay_ms: u64,
    /// Stop starting new items after this long.
    pub timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let defaults = RunSettings::default();
        Self {
            concurrency: defaults.concurrency,
            fetch_attempts: defaults.fetch_attempts,
            retry_delay_ms: millis(defaults.retry_delay),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub enum StoreConfig {
    Gcs {
        bucket: String,
        #[serde(default = "default_gcs_endpoint")]
        endpoint: String,
        #[serde(default = "default_token_env")]
        token_env: String,
    },
    LocalDir {
        path: PathBuf,
    },
}

fn default_listing_timeout_secs() -> u64 {
    30
}

fn default_gcs_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_token_env() -> String {
    "GCS_ACCESS_TOKEN".to_string()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Config = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.listing.url.trim().is_empty(), "listing.url is empty");
        anyhow::ensure!(self.run.concurrency > 0, "run.concurrency must be at least 1");
        anyhow::ensure!(
            self.reveal.stagnation_threshold > 0,
            "reveal.stagnation_threshold must be at least 1"
        );
        Ok(())
    }

    pub fn listing_settings(&self) -> HttpListingSettings {
        HttpListingSettings {
            url: self.listing.url.clone(),
            next_page_template: self.listing.next_page.clone(),
            request_timeout: Duration::from_secs(self.listing.timeout_secs),
        }
    }

    pub fn selectors(&self) -> ListingSelectors {
        let s = &self.listing.selectors;
        ListingSelectors {
            item: s.item.clone(),
            title: s.title.clone(),
            author: s.author.clone(),
            tags: s.tags.clone(),
            link: s.link.clone(),
            link_text: s.link_text.clone(),
        }
    }

    pub fn reveal_settings(&self) -> RevealSettings {
        RevealSettings {
            scroll_step: self.reveal.scroll_step,
            settle_delay: Duration::from_millis(self.reveal.settle_ms),
            final_settle: Duration::from_millis(self.reveal.final_settle_ms),
            stagnation_threshold: self.reveal.stagnation_threshold,
            max_iterations: self.reveal.max_iterations,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            allowed_content_types: self.fetch.allowed_content_types.clone(),
            download_dir: self.fetch.download_dir.clone(),
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            inter_upload_delay: Duration::from_millis(self.upload.delay_ms),
            source_page: self
                .upload
                .source_page
                .clone()
                .unwrap_or_else(|| self.listing.url.clone()),
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            concurrency: self.run.concurrency,
            fetch_attempts: self.run.fetch_attempts,
            retry_delay: Duration::from_millis(self.run.retry_delay_ms),
        }
    }

    /// GCS settings with the token taken from the configured environment variable.
    pub fn gcs_settings(
        bucket: &str,
        endpoint: &str,
        token_env: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<GcsSettings> {
        let token = lookup(token_env)
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("environment variable {token_env} is not set"))?;
        Ok(GcsSettings {
            endpoint: endpoint.to_string(),
            ..GcsSettings::new(bucket, token)
        })
    }
}
