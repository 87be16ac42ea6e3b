use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::PENDING_ID_PREFIX;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Server ids arrive either as JSON strings or as numbers depending on the
/// endpoint, so every id newtype accepts both and stores the string form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => match n.as_f64() {
                // Integral floats (`12.0`) name the same record as `12`.
                Some(f) if !n.is_u64() && !n.is_i64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    format!("{}", f as i64)
                }
                _ => n.to_string(),
            },
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Message identifier, server-assigned or locally generated while pending.
    MessageId
);
string_id!(
    /// Conversation identifier. Unknown until the server creates the thread.
    ConversationId
);
string_id!(
    /// Any account on the backend (job seeker or employer).
    UserId
);
string_id!(
    /// Job application a conversation is attached to.
    ApplicationId
);

impl MessageId {
    /// Local id for a message that has not been confirmed yet.
    pub fn pending_at(timestamp: DateTime<Utc>) -> Self {
        Self(format!("{PENDING_ID_PREFIX}{}", timestamp.timestamp_millis()))
    }

    /// Whether this id was generated locally rather than by the server.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(PENDING_ID_PREFIX)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Which side of the conversation wrote a message. Drives alignment only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
}

/// Delivery status. Advisory; the backend does not guarantee progression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Delivered,
    Read,
    /// Also the fallback for statuses this client does not know.
    #[default]
    #[serde(other)]
    Sent,
}

/// Attachment metadata carried by file messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMeta {
    /// Original file name as picked by the sender.
    pub file_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    /// Absolute download URL. `None` while the upload is pending.
    pub url: Option<String>,
}

/// A single chat entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    /// `None` until the server has created (or told us about) the conversation.
    pub conversation_id: Option<ConversationId>,
    pub sender: Sender,
    pub kind: MessageKind,
    /// Present when `kind` is [`MessageKind::Text`].
    pub text: Option<String>,
    /// Present when `kind` is [`MessageKind::File`].
    pub file: Option<FileMeta>,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// Build an unconfirmed outgoing text message stamped with `now`.
    pub fn pending_text(
        text: impl Into<String>,
        conversation_id: Option<ConversationId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::pending_at(now),
            conversation_id,
            sender: Sender::Local,
            kind: MessageKind::Text,
            text: Some(text.into()),
            file: None,
            timestamp: now,
            status: MessageStatus::Sending,
        }
    }

    /// Build an unconfirmed outgoing file message. The pending entry shows
    /// the file name and size straight away; the URL arrives with the
    /// server confirmation.
    pub fn pending_file(
        file: &PickedFile,
        conversation_id: Option<ConversationId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::pending_at(now),
            conversation_id,
            sender: Sender::Local,
            kind: MessageKind::File,
            text: None,
            file: Some(FileMeta {
                file_name: file.file_name.clone(),
                size_bytes: file.size_bytes,
                mime_type: file.mime_type.clone(),
                url: None,
            }),
            timestamp: now,
            status: MessageStatus::Sending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Sending
    }
}

/// Result of the platform file picker, handed to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    /// Local path of the picked file.
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Blocked,
    #[default]
    #[serde(other)]
    Normal,
}

/// The other party of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Participant {
    pub id: Option<UserId>,
    pub name: String,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub status: ConversationStatus,
    pub participant: Option<Participant>,
}

/// Everything one fetch of a conversation returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConversationSnapshot {
    /// `None` when the thread does not exist yet on the server.
    pub conversation: Option<Conversation>,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
}
