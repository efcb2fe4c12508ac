use std::collections::HashSet;

use courier_core::ListingItem;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Reads the item records currently materialized in a listing snapshot.
pub trait ListingExtractor: Send + Sync {
    /// Items in document order, at most one per download reference.
    fn extract(&self, html: &str) -> Vec<ListingItem>;

    /// Number of distinct entries currently visible; drives stagnation detection.
    fn count(&self, html: &str) -> usize {
        self.extract(html).len()
    }
}

/// CSS selectors describing one site's listing markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSelectors {
    pub item: String,
    pub title: String,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub link: String,
    /// Only anchors whose text contains this (case-insensitive) count as download links.
    pub link_text: Option<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: "div".to_string(),
            title: "h1, h2, h3, h4, .title".to_string(),
            author: None,
            tags: None,
            link: "a[href]".to_string(),
            link_text: Some("Download".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} selector `{selector}`")]
pub struct SelectorError {
    pub field: &'static str,
    pub selector: String,
}

/// Selector-driven extractor.
///
/// When item elements nest (the default `div` selector matches wrappers too), only the
/// innermost element that carries a download link becomes an item. Its title, author
/// and tags come from the nearest enclosing item element that has a title and holds
/// no other document. Relative download references are resolved against `base_url`,
/// and repeated references (overlapping chunks) keep their first occurrence.
#[derive(Debug)]
pub struct SelectorExtractor {
    item: Selector,
    title: Selector,
    author: Option<Selector>,
    tags: Option<Selector>,
    link: Selector,
    link_text: Option<String>,
    base_url: Option<Url>,
}

impl SelectorExtractor {
    pub fn new(selectors: &ListingSelectors, base_url: Option<&str>) -> Result<Self, SelectorError> {
        Ok(Self {
            item: parse("item", &selectors.item)?,
            title: parse("title", &selectors.title)?,
            author: selectors
                .author
                .as_deref()
                .map(|s| parse("author", s))
                .transpose()?,
            tags: selectors
                .tags
                .as_deref()
                .map(|s| parse("tags", s))
                .transpose()?,
            link: parse("link", &selectors.link)?,
            link_text: selectors
                .link_text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase),
            base_url: base_url.and_then(|b| Url::parse(b).ok()),
        })
    }

    fn download_refs(&self, element: ElementRef) -> Vec<String> {
        element
            .select(&self.link)
            .filter(|anchor| match &self.link_text {
                Some(needle) => text_of(*anchor).to_lowercase().contains(needle),
                None => true,
            })
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| self.resolve(href))
            .collect()
    }

    fn download_ref(&self, element: ElementRef) -> Option<String> {
        self.download_refs(element).into_iter().next()
    }

    fn resolve(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    fn has_linked_descendant_item(&self, element: ElementRef) -> bool {
        element
            .select(&self.item)
            .filter(|inner| inner.id() != element.id())
            .any(|inner| self.download_ref(inner).is_some())
    }

    fn has_title(&self, element: ElementRef) -> bool {
        element.select(&self.title).next().is_some()
    }

    /// The element describing the document behind `download_ref`.
    fn entry<'a>(&self, linked: ElementRef<'a>, download_ref: &str) -> ElementRef<'a> {
        if self.has_title(linked) {
            return linked;
        }
        linked
            .ancestors()
            .filter_map(ElementRef::wrap)
            .filter(|ancestor| self.item.matches(ancestor))
            .take_while(|ancestor| {
                self.download_refs(*ancestor)
                    .iter()
                    .all(|other| other == download_ref)
            })
            .find(|ancestor| self.has_title(*ancestor))
            .unwrap_or(linked)
    }

    fn read_item(&self, entry: ElementRef, download_ref: String) -> ListingItem {
        let title = entry
            .select(&self.title)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let author_line = self
            .author
            .as_ref()
            .and_then(|sel| entry.select(sel).next())
            .map(text_of)
            .filter(|a| !a.is_empty());
        let tags = self
            .tags
            .as_ref()
            .map(|sel| {
                entry
                    .select(sel)
                    .map(text_of)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        ListingItem {
            title,
            author_line,
            tags,
            download_ref: Some(download_ref),
        }
    }
}

impl ListingExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Vec<ListingItem> {
        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();
        doc.select(&self.item)
            .filter_map(|element| self.download_ref(element).map(|href| (element, href)))
            .filter(|(element, _)| !self.has_linked_descendant_item(*element))
            .filter(|(_, href)| seen.insert(href.clone()))
            .map(|(element, href)| self.read_item(self.entry(element, &href), href))
            .collect()
    }
}

fn parse(field: &'static str, selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|_| SelectorError {
        field,
        selector: selector.to_string(),
    })
}

fn text_of(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
