use hirechat_shared::MessageId;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An entry with this id is already in the store.
    #[error("Duplicate message id: {0}")]
    DuplicateId(MessageId),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
