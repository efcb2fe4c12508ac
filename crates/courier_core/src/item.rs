use url::Url;

/// One entry discovered on the listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingItem {
    pub title: String,
    pub author_line: Option<String>,
    pub tags: Vec<String>,
    pub download_ref: Option<String>,
}

impl ListingItem {
    pub fn new(title: impl Into<String>, download_ref: Option<String>) -> Self {
        Self {
            title: title.into(),
            download_ref,
            ..Self::default()
        }
    }

    /// Last path segment of the download reference, if it looks like a filename.
    pub fn name_hint(&self) -> Option<String> {
        let reference = self.download_ref.as_deref()?;
        let last = match Url::parse(reference) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string)),
            Err(_) => reference
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
                .map(str::to_string),
        };
        last.filter(|name| !name.trim().is_empty())
    }

    /// An item is actionable when it can be fetched and will end up with a usable key.
    pub fn is_actionable(&self) -> bool {
        let has_ref = self
            .download_ref
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        has_ref && (!self.title.trim().is_empty() || self.name_hint().is_some())
    }

    /// Short label used in log lines.
    pub fn label(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.trim().to_string();
        }
        self.download_ref
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}
