//! Courier core: pure domain types and decision logic for the delivery pipeline.
mod item;
mod key;
mod phase;
mod record;
mod stagnation;
mod stats;

pub use item::ListingItem;
pub use key::{derive_key, sanitize_title, DOCUMENT_CONTENT_TYPE, DOCUMENT_EXTENSION, MAX_STEM_CHARS};
pub use phase::RunPhase;
pub use record::{UploadRecord, TAG_DELIMITER};
pub use stagnation::{StagnationTracker, Step};
pub use stats::{ItemOutcome, RunStats};
