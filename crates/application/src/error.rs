use std::time::Duration;

use photoflow_domain::{DomainError, ImageId, ImageVariant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("decode lane {0} is closed")]
    LaneClosed(String),
    #[error("{operation} must run on the thread that owns the image manager")]
    OffOwnerThread { operation: &'static str },
}

/// Coarse outcome of a failed fetch, matching the two kinds callers historically saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ImageNotFound,
    UnableToReadImage,
}

/// Terminal failure of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("image {0} not found")]
    ImageNotFound(ImageId),
    #[error("image {id} has no {variant} payload")]
    PayloadMissing { id: ImageId, variant: ImageVariant },
    #[error("image {id} could not be decoded: {reason}")]
    DecodeFailed { id: ImageId, reason: String },
    #[error("store read failed: {0}")]
    Store(String),
    #[error("decode lane closed before the fetch was delivered")]
    LaneClosed,
    #[error("fetch timed out after {0:?}")]
    TimedOut(Duration),
}

impl FetchError {
    /// Collapses everything except a missing record into `UnableToReadImage`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageNotFound(_) => ErrorKind::ImageNotFound,
            Self::PayloadMissing { .. }
            | Self::DecodeFailed { .. }
            | Self::Store(_)
            | Self::LaneClosed
            | Self::TimedOut(_) => ErrorKind::UnableToReadImage,
        }
    }
}
