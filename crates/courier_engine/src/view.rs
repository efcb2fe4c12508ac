use std::time::Duration;

use courier_logging::{courier_debug, courier_info};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::decode::decode_page;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("listing view has no disclosure mechanism")]
    DisclosureUnavailable,
    #[error("failed to load listing content: {0}")]
    Load(String),
}

/// A rendered listing that can reveal more entries on demand.
///
/// A browser-backed implementation scrolls by `step` pixels; the HTTP implementation
/// treats each call as a request for the next chunk of the listing.
#[async_trait::async_trait]
pub trait ListingView: Send {
    /// Location of the listing itself, used as the source page of every document.
    fn location(&self) -> &str;

    /// Triggers progressive disclosure once.
    async fn disclose(&mut self, step: u32) -> Result<(), ViewError>;

    /// The currently materialized listing markup.
    async fn snapshot(&mut self) -> Result<String, ViewError>;
}

#[derive(Debug, Clone)]
pub struct HttpListingSettings {
    pub url: String,
    /// Template for follow-up chunks; `{page}` is the 1-based chunk number
    /// (the initial page is 1) and `{offset}` the accumulated disclosure steps.
    pub next_page_template: Option<String>,
    pub request_timeout: Duration,
}

impl HttpListingSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_page_template: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Listing whose lazy-loaded chunks are requested directly over HTTP and appended to
/// the materialized document, the way the page script would.
#[derive(Debug)]
pub struct HttpListingView {
    client: reqwest::Client,
    settings: HttpListingSettings,
    chunks: Vec<String>,
    page: u32,
    offset: u64,
    exhausted: bool,
}

impl HttpListingView {
    /// Loads the initial page.
    pub async fn open(settings: HttpListingSettings) -> Result<Self, ViewError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ViewError::Load(err.to_string()))?;
        let first = match load(&client, &settings.url).await? {
            Some(html) => html,
            None => {
                return Err(ViewError::Load(format!(
                    "listing {} returned no content",
                    settings.url
                )))
            }
        };
        courier_info!("Opened listing {} ({} bytes)", settings.url, first.len());
        Ok(Self {
            client,
            settings,
            chunks: vec![first],
            page: 1,
            offset: 0,
            exhausted: false,
        })
    }

    fn next_url(&self, template: &str, step: u32) -> String {
        template
            .replace("{page}", &(self.page + 1).to_string())
            .replace("{offset}", &(self.offset + u64::from(step)).to_string())
    }
}

#[async_trait::async_trait]
impl ListingView for HttpListingView {
    fn location(&self) -> &str {
        &self.settings.url
    }

    async fn disclose(&mut self, step: u32) -> Result<(), ViewError> {
        let Some(template) = self.settings.next_page_template.as_deref() else {
            return Err(ViewError::DisclosureUnavailable);
        };
        if self.exhausted {
            return Ok(());
        }
        let url = self.next_url(template, step);

        // A failed load leaves the cursor alone so the same chunk is requested again.
        match load(&self.client, &url).await? {
            Some(chunk) if !chunk.trim().is_empty() => {
                self.page += 1;
                self.offset += u64::from(step);
                courier_debug!("Disclosed chunk {} from {}", self.page, url);
                self.chunks.push(chunk);
            }
            _ => {
                courier_debug!("Listing exhausted at {}", url);
                self.exhausted = true;
            }
        }
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String, ViewError> {
        Ok(self.chunks.join("\n"))
    }
}

/// `Ok(None)` when the server says there is nothing at `url`.
async fn load(client: &reqwest::Client, url: &str) -> Result<Option<String>, ViewError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| ViewError::Load(err.to_string()))?;
    let status = response.status();
    if matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::NO_CONTENT
    ) {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ViewError::Load(format!("{url}: http status {status}")));
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ViewError::Load(err.to_string()))?;
    Ok(Some(decode_page(&bytes, content_type.as_deref())))
}
