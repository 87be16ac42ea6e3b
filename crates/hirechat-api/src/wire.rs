//! JSON shapes exchanged with the backend and their conversion into the
//! domain types of `hirechat-shared`.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use hirechat_shared::{
    ApplicationId, Conversation, ConversationId, ConversationSnapshot, ConversationStatus,
    FileMeta, Message, MessageId, MessageKind, MessageStatus, Participant, Sender, UserId,
};

use crate::error::ApiError;

/// Envelope wrapping every backend response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub errors: Option<serde_json::Value>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, mapping `success: false` to [`ApiError::Rejected`].
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(self.rejection());
        }
        self.data
            .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }

    /// For endpoints whose only payload is a confirmation text.
    pub fn into_message(self) -> Result<String, ApiError> {
        if !self.success {
            return Err(self.rejection());
        }
        Ok(self.message.unwrap_or_default())
    }

    fn rejection(self) -> ApiError {
        ApiError::Rejected {
            message: self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Request failed".to_string()),
            errors: self.errors,
        }
    }
}

/// Payload of the conversation endpoint.
#[derive(Debug, Deserialize)]
pub struct ConversationData {
    pub conversation: Option<WireConversation>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WireConversation {
    pub id: ConversationId,
    pub status: Option<ConversationStatus>,
    #[serde(alias = "participant")]
    pub other_participant: Option<WireParticipant>,
}

#[derive(Debug, Deserialize)]
pub struct WireParticipant {
    pub id: Option<UserId>,
    pub name: Option<String>,
    #[serde(alias = "avatar_url")]
    pub avatar: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: MessageId,
    pub conversation_id: Option<ConversationId>,
    pub sender_id: Option<UserId>,
    /// Some endpoints flag the caller's own messages directly.
    pub is_mine: Option<bool>,
    #[serde(alias = "type")]
    pub message_type: Option<String>,
    #[serde(alias = "text")]
    pub message: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    #[serde(alias = "mime_type")]
    pub file_type: Option<String>,
    pub file_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: Option<MessageStatus>,
}

/// JSON body of a text send.
#[derive(Debug, Serialize)]
pub struct TextMessageBody<'a> {
    pub recipient_id: &'a UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<&'a ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a ConversationId>,
    pub message: &'a str,
    pub message_type: &'static str,
}

/// What the decoder needs to know about the caller.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    /// Account of the local user, used to tell own messages apart.
    pub local_user: Option<UserId>,
    /// Base for resolving relative file and avatar URLs.
    pub base_url: Url,
}

impl DecodeContext {
    fn resolve_url(&self, raw: Option<String>) -> Option<String> {
        let raw = raw?;
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) => Some(url.to_string()),
            Err(_) => self.base_url.join(raw).ok().map(String::from),
        }
    }
}

impl WireMessage {
    pub fn into_message(self, ctx: &DecodeContext) -> Message {
        let sender = match (self.is_mine, &self.sender_id, &ctx.local_user) {
            (Some(true), _, _) => Sender::Local,
            (None, Some(sender), Some(me)) if sender == me => Sender::Local,
            _ => Sender::Remote,
        };

        let is_file = match self.message_type.as_deref() {
            Some(t) => t.eq_ignore_ascii_case("file"),
            None => self.file_url.is_some(),
        };

        let (kind, text, file) = if is_file {
            let url = ctx.resolve_url(self.file_url);
            let file_name = self
                .file_name
                .or_else(|| {
                    url.as_deref()
                        .and_then(|u| u.rsplit('/').next())
                        .filter(|segment| !segment.is_empty())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "file".to_string());
            let meta = FileMeta {
                file_name,
                size_bytes: self.file_size.unwrap_or(0),
                mime_type: self.file_type,
                url,
            };
            (MessageKind::File, self.message, Some(meta))
        } else {
            (MessageKind::Text, Some(self.message.unwrap_or_default()), None)
        };

        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender,
            kind,
            text,
            file,
            timestamp: self.created_at.unwrap_or_else(Utc::now),
            status: self.status.unwrap_or_default(),
        }
    }
}

impl WireConversation {
    pub fn into_conversation(self, ctx: &DecodeContext) -> Conversation {
        Conversation {
            id: self.id,
            status: self.status.unwrap_or_default(),
            participant: self.other_participant.map(|p| Participant {
                id: p.id,
                name: p.name.unwrap_or_default(),
                avatar_url: ctx.resolve_url(p.avatar),
                email: p.email,
            }),
        }
    }
}

impl ConversationData {
    pub fn into_snapshot(self, ctx: &DecodeContext) -> ConversationSnapshot {
        ConversationSnapshot {
            conversation: self.conversation.map(|c| c.into_conversation(ctx)),
            messages: self
                .messages
                .into_iter()
                .map(|m| m.into_message(ctx))
                .collect(),
        }
    }
}
