use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// Where the fetched document lives until the uploader is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadBody {
    Bytes(Bytes),
    /// Transient on-disk copy; released by the uploader after a commit.
    File(PathBuf),
}

/// A fetched document and the filename the source suggested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: PayloadBody,
    pub suggested_name: String,
}

impl Payload {
    pub fn in_memory(bytes: impl Into<Bytes>, suggested_name: impl Into<String>) -> Self {
        Self {
            body: PayloadBody::Bytes(bytes.into()),
            suggested_name: suggested_name.into(),
        }
    }

    pub fn on_disk(path: impl Into<PathBuf>, suggested_name: impl Into<String>) -> Self {
        Self {
            body: PayloadBody::File(path.into()),
            suggested_name: suggested_name.into(),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.body {
            PayloadBody::File(path) => Some(path),
            PayloadBody::Bytes(_) => None,
        }
    }
}

/// Result of committing one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Committed { key: String },
    /// Reserved for stores that check before writing; the uploader always overwrites.
    AlreadyPresent { key: String },
    Failed { key: String, reason: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, UploadOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{item}: {kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
    pub item: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            item: String::new(),
        }
    }

    pub fn for_item(mut self, label: impl Into<String>) -> Self {
        self.item = label.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MissingReference,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Navigation,
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingReference => write!(f, "missing download reference"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Navigation => write!(f, "navigation error"),
            FailureKind::Io => write!(f, "local io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
