//! Scripted [`ChatApi`] used by the session and sync tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::{mpsc, Notify};

use hirechat_api::{ApiError, ChatApi, MessageQuery, SendRequest};
use hirechat_shared::{
    Conversation, ConversationId, ConversationSnapshot, ConversationStatus, Message, MessageId,
    MessageKind, MessageStatus, Sender,
};

use crate::events::ChatEvent;
use crate::session::SessionTarget;

#[derive(Default)]
pub(crate) struct FakeApi {
    snapshots: Mutex<VecDeque<Result<ConversationSnapshot, ApiError>>>,
    /// Answer once the scripted snapshots are used up.
    fallback: Mutex<ConversationSnapshot>,
    sends: Mutex<VecDeque<Result<Message, ApiError>>>,
    block_result: Mutex<Option<Result<String, ApiError>>>,
    /// When set, sends wait for a notification before answering.
    send_gate: Option<Arc<Notify>>,
    /// Same for conversation fetches.
    fetch_gate: Option<Arc<Notify>>,
    pub fetches: AtomicUsize,
    pub blocks: AtomicUsize,
    pub queries: Mutex<Vec<MessageQuery>>,
    pub sent: Mutex<Vec<SendRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            send_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_fetch_gate(gate: Arc<Notify>) -> Self {
        Self {
            fetch_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_snapshot(&self, result: Result<ConversationSnapshot, ApiError>) {
        self.snapshots.lock().unwrap().push_back(result);
    }

    pub fn set_fallback(&self, snapshot: ConversationSnapshot) {
        *self.fallback.lock().unwrap() = snapshot;
    }

    pub fn push_send(&self, result: Result<Message, ApiError>) {
        self.sends.lock().unwrap().push_back(result);
    }

    pub fn set_block(&self, result: Result<String, ApiError>) {
        *self.block_result.lock().unwrap() = Some(result);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<MessageQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn get_conversation_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<ConversationSnapshot, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some(gate) = &self.fetch_gate {
            gate.notified().await;
        }
        let scripted = self.snapshots.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn send_message(&self, request: SendRequest) -> Result<Message, ApiError> {
        self.sent.lock().unwrap().push(request);
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        let scripted = self.sends.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Err(ApiError::Network("no scripted response".into())))
    }

    async fn block_conversation(
        &self,
        _conversation_id: &ConversationId,
    ) -> Result<String, ApiError> {
        self.blocks.fetch_add(1, Ordering::SeqCst);
        let scripted = self.block_result.lock().unwrap().take();
        scripted.unwrap_or_else(|| Ok("Conversation blocked".into()))
    }
}

pub(crate) fn target() -> SessionTarget {
    SessionTarget {
        conversation_id: None,
        application_id: Some("12".into()),
        jobseeker_id: Some("5".into()),
        recipient_id: "7".into(),
    }
}

pub(crate) fn message(id: &str, sender: Sender, text: &str, minute: i64) -> Message {
    Message {
        id: MessageId::from(id),
        conversation_id: Some(ConversationId::from("31")),
        sender,
        kind: MessageKind::Text,
        text: Some(text.into()),
        file: None,
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute),
        status: MessageStatus::Delivered,
    }
}

pub(crate) fn remote(id: &str, text: &str, minute: i64) -> Message {
    message(id, Sender::Remote, text, minute)
}

pub(crate) fn snapshot(status: ConversationStatus, messages: Vec<Message>) -> ConversationSnapshot {
    ConversationSnapshot {
        conversation: Some(Conversation {
            id: ConversationId::from("31"),
            status,
            participant: None,
        }),
        messages,
    }
}

pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub(crate) fn alerts(events: &[ChatEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ChatEvent::Alert { .. }))
        .count()
}
