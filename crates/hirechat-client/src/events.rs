use serde::Serialize;
use tokio::sync::mpsc;

use hirechat_shared::ConversationId;

/// Notifications published by a session for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The initial load started or finished.
    LoadingChanged { loading: bool },
    /// The message list changed; re-read [`crate::ChatSession::messages`].
    MessagesChanged { count: usize },
    /// The view should scroll to the newest message.
    ScrollToBottom { animated: bool },
    /// One-shot user-visible error.
    Alert { title: String, message: String },
    /// The server created or reported the conversation id.
    ConversationResolved { conversation_id: ConversationId },
    /// The send affordance should be disabled (`true`) or enabled again.
    SendingChanged { in_flight: bool },
    Blocked,
}

pub type EventSender = mpsc::UnboundedSender<ChatEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ChatEvent>;

pub fn emit_event(tx: &EventSender, event: ChatEvent) {
    if let Err(e) = tx.send(event) {
        tracing::debug!(event = ?e.0, "Event receiver dropped");
    }
}

pub(crate) fn alert(tx: &EventSender, title: &str, message: impl Into<String>) {
    emit_event(
        tx,
        ChatEvent::Alert {
            title: title.to_string(),
            message: message.into(),
        },
    );
}
