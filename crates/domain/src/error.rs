use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("image id must be positive, got {0}")]
    InvalidImageId(i64),
    #[error("image hash must be 1 to 16 hex digits, got {0:?}")]
    InvalidHash(String),
}
