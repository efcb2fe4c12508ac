use std::collections::BTreeMap;

use crate::key::{derive_key, DOCUMENT_CONTENT_TYPE};
use crate::ListingItem;

/// Separator used when flattening tags into a single metadata value.
pub const TAG_DELIMITER: &str = ", ";

/// The object as it will be committed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub key: String,
    pub content_type: &'static str,
    pub metadata: BTreeMap<String, String>,
}

impl UploadRecord {
    /// Builds the record for `item`. Metadata keys are only present for non-empty fields.
    pub fn for_item(item: &ListingItem, suggested_name: &str, source_page: &str) -> Self {
        let mut metadata = BTreeMap::new();
        insert_non_empty(&mut metadata, "title", item.title.trim());
        if let Some(author) = item.author_line.as_deref() {
            insert_non_empty(&mut metadata, "author", author.trim());
        }
        let tags: Vec<&str> = item
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        insert_non_empty(&mut metadata, "tags", &tags.join(TAG_DELIMITER));
        insert_non_empty(&mut metadata, "sourcePage", source_page.trim());

        Self {
            key: derive_key(&item.title, suggested_name),
            content_type: DOCUMENT_CONTENT_TYPE,
            metadata,
        }
    }
}

fn insert_non_empty(metadata: &mut BTreeMap<String, String>, key: &str, value: &str) {
    if !value.is_empty() {
        metadata.insert(key.to_string(), value.to_string());
    }
}
