//! Courier engine: listing discovery, document retrieval and delivery.
mod coordinator;
mod decode;
mod extract;
mod fetch;
mod filename;
mod object_dir;
mod reveal;
mod session;
mod store;
mod types;
mod upload;
mod view;

pub use coordinator::{Coordinator, RunError, RunSettings};
pub use decode::decode_page;
pub use extract::{ListingExtractor, ListingSelectors, SelectorError, SelectorExtractor};
pub use fetch::{FetchSettings, Fetcher, HttpFetcher};
pub use filename::suggested_filename;
pub use object_dir::{ObjectDir, ObjectDirError, SIDECAR_SUFFIX};
pub use reveal::{RevealError, RevealReport, RevealSettings, Revealer};
pub use session::{BrowserSession, DownloadedFile, SessionError, SessionFetcher};
pub use store::{GcsSettings, GcsStore, LocalDirStore, ObjectStore, StoreError};
pub use types::{FailureKind, FetchError, Payload, PayloadBody, UploadOutcome};
pub use upload::{UploadSettings, Uploader};
pub use view::{HttpListingSettings, HttpListingView, ListingView, ViewError};
