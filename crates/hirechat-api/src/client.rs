use async_trait::async_trait;
use serde::Serialize;

use hirechat_shared::{
    ApplicationId, ConversationId, ConversationSnapshot, Message, PickedFile, UserId,
};

use crate::error::ApiError;

/// Selects the conversation to fetch. The conversation id is preferred;
/// before it is known the thread is looked up by application and job seeker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobseeker_id: Option<UserId>,
}

impl MessageQuery {
    /// Drop the fallback selectors once the conversation id is known.
    pub fn normalized(self) -> Self {
        match self.conversation_id {
            Some(id) => Self {
                conversation_id: Some(id),
                application_id: None,
                jobseeker_id: None,
            },
            None => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendBody {
    Text(String),
    File(PickedFile),
}

impl SendBody {
    /// Value of the `message_type` field on the wire.
    pub fn message_type(&self) -> &'static str {
        match self {
            SendBody::Text(_) => "text",
            SendBody::File(_) => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient_id: UserId,
    pub application_id: Option<ApplicationId>,
    /// `None` lets the server create the conversation on first send.
    pub conversation_id: Option<ConversationId>,
    pub body: SendBody,
}

/// Backend operations the chat session depends on.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Current conversation record and its messages, oldest first.
    async fn get_conversation_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<ConversationSnapshot, ApiError>;

    /// Send a text message or upload a file; returns the stored message.
    async fn send_message(&self, request: SendRequest) -> Result<Message, ApiError>;

    /// Block the conversation; returns the server's confirmation text.
    async fn block_conversation(&self, conversation_id: &ConversationId)
        -> Result<String, ApiError>;
}
