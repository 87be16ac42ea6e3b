use thiserror::Error;

use hirechat_api::ApiError;
use hirechat_shared::MessageId;
use hirechat_store::StoreError;

use crate::viewer::OpenError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Could not open attachment: {0}")]
    Open(#[from] OpenError),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("Message {0} has no attachment")]
    NotAFile(MessageId),

    #[error("Attachment of message {0} has no URL")]
    MissingFileUrl(MessageId),

    /// The conversation has not been created on the server yet.
    #[error("Conversation id is not known yet")]
    ConversationUnknown,

    #[error("Session is closed")]
    SessionClosed,
}

/// Why a send was refused before reaching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyText,
    Blocked,
    InFlight,
    FileTooLarge,
    Closed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::EmptyText => "empty message",
            RejectReason::Blocked => "conversation is blocked",
            RejectReason::InFlight => "a message is already being sent",
            RejectReason::FileTooLarge => "file is too large",
            RejectReason::Closed => "session is closed",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
