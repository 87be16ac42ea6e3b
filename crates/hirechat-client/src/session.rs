//! Per-conversation session state.
//!
//! A [`ChatSession`] owns everything the conversation screen needs: the
//! message store, the in-flight flag, conversation metadata, the scroll
//! tracker and the input draft.  It is shared behind an `Arc` between the
//! UI and the sync task; the inner mutex is never held across an `.await`,
//! so mutations are serialized while network calls interleave freely.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use hirechat_api::{ChatApi, MessageQuery, SendBody, SendRequest};
use hirechat_shared::constants::MAX_FILE_SIZE;
use hirechat_shared::{
    ApplicationId, Conversation, ConversationId, ConversationStatus, Message, MessageId,
    Participant, PickedFile, UserId,
};
use hirechat_store::MessageStore;

use crate::config::ClientConfig;
use crate::error::{ChatError, RejectReason};
use crate::events::{alert, emit_event, ChatEvent, EventReceiver, EventSender};
use crate::scroll::ScrollTracker;
use crate::viewer::{open_file, FileOpener, ViewStrategy};

/// Which conversation a session shows and who receives its messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    /// Known once the conversation exists on the server.
    pub conversation_id: Option<ConversationId>,
    pub application_id: Option<ApplicationId>,
    pub jobseeker_id: Option<UserId>,
    /// The other participant.
    pub recipient_id: UserId,
}

impl SessionTarget {
    fn query(&self) -> MessageQuery {
        MessageQuery {
            conversation_id: self.conversation_id.clone(),
            application_id: self.application_id.clone(),
            jobseeker_id: self.jobseeker_id.clone(),
        }
        .normalized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied {
        /// A different message ended up at the bottom of the list.
        new_messages: bool,
        /// A scroll to the bottom was requested.
        scrolled: bool,
    },
    /// The session closed or switched conversation while the request ran.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The server stored the message; this is its confirmed copy.
    Sent(Message),
    /// Refused locally; nothing was sent and the store is unchanged.
    Rejected(RejectReason),
    /// The session closed or switched conversation before the server answered.
    Abandoned,
}

struct SessionState {
    target: SessionTarget,
    store: MessageStore,
    status: ConversationStatus,
    participant: Option<Participant>,
    sending: bool,
    closed: bool,
    scroll: ScrollTracker,
    draft: String,
    /// Bumped on every conversation switch so late responses can be dropped.
    generation: u64,
}

impl SessionState {
    fn reject_reason(&self) -> Option<RejectReason> {
        if self.closed {
            Some(RejectReason::Closed)
        } else if self.status == ConversationStatus::Blocked {
            Some(RejectReason::Blocked)
        } else if self.sending {
            Some(RejectReason::InFlight)
        } else {
            None
        }
    }

    fn resolve_conversation_id(&mut self, id: &ConversationId, events: &mut Vec<ChatEvent>) {
        if self.target.conversation_id.is_none() {
            info!(conversation = %id, "Conversation resolved");
            self.target.conversation_id = Some(id.clone());
            events.push(ChatEvent::ConversationResolved {
                conversation_id: id.clone(),
            });
        }
    }

    fn apply_conversation(&mut self, conversation: Conversation, events: &mut Vec<ChatEvent>) {
        self.resolve_conversation_id(&conversation.id, events);
        if conversation.participant.is_some() {
            self.participant = conversation.participant;
        }
        // Blocking is terminal; a stale snapshot cannot unblock.
        if conversation.status == ConversationStatus::Blocked
            && self.status != ConversationStatus::Blocked
        {
            self.status = ConversationStatus::Blocked;
            events.push(ChatEvent::Blocked);
        }
    }
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    events: EventSender,
    poll_interval: Duration,
    state: Mutex<SessionState>,
}

impl ChatSession {
    /// Create a session and the receiver of its events.
    pub fn new(
        api: Arc<dyn ChatApi>,
        config: &ClientConfig,
        target: SessionTarget,
    ) -> (Arc<Self>, EventReceiver) {
        let (events, rx) = tokio::sync::mpsc::unbounded_channel();
        let session = Arc::new(Self {
            api,
            events,
            poll_interval: config.poll_interval,
            state: Mutex::new(SessionState {
                target,
                store: MessageStore::new(),
                status: ConversationStatus::Normal,
                participant: None,
                sending: false,
                closed: false,
                scroll: ScrollTracker::new(config.near_bottom_px),
                draft: String::new(),
                generation: 0,
            }),
        });
        (session, rx)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_all(&self, events: Vec<ChatEvent>) {
        for event in events {
            emit_event(&self.events, event);
        }
    }

    // -- Read accessors -----------------------------------------------------

    /// Snapshot of the messages in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().store.messages().to_vec()
    }

    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.lock().store.get(id).cloned()
    }

    pub fn target(&self) -> SessionTarget {
        self.lock().target.clone()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.lock().target.conversation_id.clone()
    }

    pub fn participant(&self) -> Option<Participant> {
        self.lock().participant.clone()
    }

    pub fn is_blocked(&self) -> bool {
        self.lock().status == ConversationStatus::Blocked
    }

    pub fn is_sending(&self) -> bool {
        self.lock().sending
    }

    /// Whether the send affordance should be enabled.
    pub fn can_send(&self) -> bool {
        self.lock().reject_reason().is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    // -- Input --------------------------------------------------------------

    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock().draft = text.into();
    }

    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    /// Record a scroll event; returns whether the view is near the bottom.
    pub fn on_scroll(&self, content_height: f64, scroll_offset: f64, viewport_height: f64) -> bool {
        self.lock()
            .scroll
            .on_scroll(content_height, scroll_offset, viewport_height)
    }

    pub fn is_near_bottom(&self) -> bool {
        self.lock().scroll.is_near_bottom()
    }

    // -- Sync ---------------------------------------------------------------

    /// Fetch the conversation and merge it into the store.
    ///
    /// With `show_loader` (initial load) the loading state is published and
    /// the view always scrolls to the bottom.  Otherwise the refresh is
    /// silent and only follows new messages if the user was near the bottom
    /// when the poll started.
    pub async fn load(&self, show_loader: bool) -> Result<LoadOutcome, ChatError> {
        let (query, generation, scroll_at_start) = {
            let state = self.lock();
            if state.closed {
                return Err(ChatError::SessionClosed);
            }
            (
                state.target.query(),
                state.generation,
                state.scroll.clone(),
            )
        };

        if show_loader {
            emit_event(&self.events, ChatEvent::LoadingChanged { loading: true });
        }
        let result = self.api.get_conversation_messages(&query).await;
        if show_loader {
            emit_event(&self.events, ChatEvent::LoadingChanged { loading: false });
        }
        let snapshot = result?;

        let mut events = Vec::new();
        let outcome = {
            let mut state = self.lock();
            if state.closed || state.generation != generation {
                debug!("Discarding conversation response for a stale session");
                return Ok(LoadOutcome::Discarded);
            }

            if let Some(conversation) = snapshot.conversation {
                state.apply_conversation(conversation, &mut events);
            }

            let merge = state.store.replace_all(snapshot.messages);
            let new_messages = merge.has_new_tail();
            events.push(ChatEvent::MessagesChanged {
                count: state.store.len(),
            });

            let scrolled = if show_loader {
                events.push(ChatEvent::ScrollToBottom { animated: false });
                true
            } else if scroll_at_start.should_follow(new_messages) {
                events.push(ChatEvent::ScrollToBottom { animated: true });
                true
            } else {
                false
            };

            LoadOutcome::Applied {
                new_messages,
                scrolled,
            }
        };

        self.emit_all(events);
        Ok(outcome)
    }

    /// Hide the loader of an initial load that was abandoned mid-request.
    pub(crate) fn end_loading(&self) {
        emit_event(&self.events, ChatEvent::LoadingChanged { loading: false });
    }

    // -- Sending ------------------------------------------------------------

    /// Send a text message optimistically.
    pub async fn send_text(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Rejected(RejectReason::EmptyText));
        }
        let now = Utc::now();
        self.dispatch(
            |conversation_id| Message::pending_text(text, conversation_id, now),
            SendBody::Text(text.to_string()),
        )
        .await
    }

    /// Send whatever is currently in the draft.
    pub async fn send_draft(&self) -> Result<SendOutcome, ChatError> {
        let draft = self.draft();
        self.send_text(&draft).await
    }

    /// Upload a picked file optimistically.
    pub async fn send_file(&self, file: PickedFile) -> Result<SendOutcome, ChatError> {
        let rejected = self.lock().reject_reason();
        if let Some(reason) = rejected {
            return Ok(SendOutcome::Rejected(reason));
        }
        if file.size_bytes > MAX_FILE_SIZE {
            warn!(file = %file.file_name, size = file.size_bytes, "File exceeds upload limit");
            alert(
                &self.events,
                "File too large",
                format!(
                    "{} is larger than the {} MB limit.",
                    file.file_name,
                    MAX_FILE_SIZE / (1024 * 1024)
                ),
            );
            return Ok(SendOutcome::Rejected(RejectReason::FileTooLarge));
        }

        let now = Utc::now();
        let pending_file = file.clone();
        self.dispatch(
            move |conversation_id| Message::pending_file(&pending_file, conversation_id, now),
            SendBody::File(file),
        )
        .await
    }

    /// Shared pending → network → confirm/rollback lifecycle.
    async fn dispatch(
        &self,
        build_pending: impl FnOnce(Option<ConversationId>) -> Message,
        body: SendBody,
    ) -> Result<SendOutcome, ChatError> {
        let (pending_id, request, generation, count) = {
            let mut state = self.lock();
            if let Some(reason) = state.reject_reason() {
                debug!(%reason, "Send rejected");
                return Ok(SendOutcome::Rejected(reason));
            }

            let pending = build_pending(state.target.conversation_id.clone());
            let pending_id = state.store.append_pending(pending)?;
            state.sending = true;
            state.draft.clear();

            let request = SendRequest {
                recipient_id: state.target.recipient_id.clone(),
                application_id: state.target.application_id.clone(),
                conversation_id: state.target.conversation_id.clone(),
                body,
            };
            (pending_id, request, state.generation, state.store.len())
        };

        self.emit_all(vec![
            ChatEvent::SendingChanged { in_flight: true },
            ChatEvent::MessagesChanged { count },
            ChatEvent::ScrollToBottom { animated: true },
        ]);
        info!(
            pending = %pending_id,
            kind = request.body.message_type(),
            "Sending message"
        );

        let result = self.api.send_message(request).await;

        let mut events = Vec::new();
        let outcome = {
            let mut state = self.lock();
            if state.closed || state.generation != generation {
                debug!(pending = %pending_id, "Dropping send result for a stale session");
                return Ok(SendOutcome::Abandoned);
            }
            state.sending = false;
            events.push(ChatEvent::SendingChanged { in_flight: false });

            match result {
                Ok(confirmed) => {
                    if let Some(id) = &confirmed.conversation_id {
                        state.resolve_conversation_id(id, &mut events);
                    }
                    state.store.confirm(&pending_id, confirmed.clone());
                    events.push(ChatEvent::MessagesChanged {
                        count: state.store.len(),
                    });
                    Ok(SendOutcome::Sent(confirmed))
                }
                Err(e) => {
                    warn!(pending = %pending_id, error = %e, "Send failed, rolling back");
                    state.store.rollback(&pending_id);
                    events.push(ChatEvent::MessagesChanged {
                        count: state.store.len(),
                    });
                    events.push(ChatEvent::Alert {
                        title: "Message not sent".to_string(),
                        message: e.user_message(),
                    });
                    Err(ChatError::Api(e))
                }
            }
        };

        self.emit_all(events);
        outcome
    }

    // -- Conversation actions -----------------------------------------------

    /// Block the conversation. Blocking cannot be undone from the client.
    pub async fn block(&self) -> Result<(), ChatError> {
        let conversation_id = {
            let state = self.lock();
            if state.closed {
                return Err(ChatError::SessionClosed);
            }
            if state.status == ConversationStatus::Blocked {
                return Ok(());
            }
            state.target.conversation_id.clone()
        };

        let Some(conversation_id) = conversation_id else {
            alert(
                &self.events,
                "Cannot block",
                "This conversation has not started yet.",
            );
            return Err(ChatError::ConversationUnknown);
        };

        match self.api.block_conversation(&conversation_id).await {
            Ok(message) => {
                {
                    let mut state = self.lock();
                    if state.closed {
                        return Ok(());
                    }
                    state.status = ConversationStatus::Blocked;
                }
                info!(conversation = %conversation_id, %message, "Conversation blocked by user");
                emit_event(&self.events, ChatEvent::Blocked);
                Ok(())
            }
            Err(e) => {
                warn!(conversation = %conversation_id, error = %e, "Block failed");
                alert(&self.events, "Could not block", e.user_message());
                Err(e.into())
            }
        }
    }

    /// Open the attachment of a message through the platform `opener`.
    pub fn open_attachment(
        &self,
        id: &MessageId,
        opener: &dyn FileOpener,
    ) -> Result<ViewStrategy, ChatError> {
        let file = {
            let state = self.lock();
            let message = state
                .store
                .get(id)
                .ok_or_else(|| ChatError::MessageNotFound(id.clone()))?;
            message
                .file
                .clone()
                .ok_or_else(|| ChatError::NotAFile(id.clone()))?
        };

        if file.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            alert(&self.events, "Cannot open file", "This file is not available.");
            return Err(ChatError::MissingFileUrl(id.clone()));
        }

        open_file(&file, opener).map_err(|e| {
            alert(&self.events, "Cannot open file", e.to_string());
            ChatError::Open(e)
        })
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Point the session at another conversation, discarding the current
    /// store. Responses to requests issued before the switch are ignored.
    pub(crate) fn reset(&self, target: SessionTarget) {
        {
            let mut state = self.lock();
            state.generation += 1;
            state.target = target;
            state.store.clear();
            state.status = ConversationStatus::Normal;
            state.participant = None;
            state.sending = false;
            state.draft.clear();
        }
        self.emit_all(vec![
            ChatEvent::MessagesChanged { count: 0 },
            ChatEvent::SendingChanged { in_flight: false },
        ]);
    }

    /// Mark the session as gone; later responses are dropped.
    pub fn close(&self) {
        self.lock().closed = true;
        debug!("Chat session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::test_support::*;
    use hirechat_api::ApiError;
    use hirechat_shared::{MessageKind, MessageStatus, Sender};

    fn session_with(api: Arc<FakeApi>) -> (Arc<ChatSession>, EventReceiver) {
        ChatSession::new(api, &ClientConfig::default(), target())
    }

    async fn wait_until_sending(session: &ChatSession) {
        while !session.is_sending() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_send_success_confirms_and_clears_draft_early() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        let mut confirmed = message("900", Sender::Local, "hello", 0);
        confirmed.status = MessageStatus::Delivered;
        api.push_send(Ok(confirmed));

        let (session, mut rx) = session_with(api.clone());
        session.set_draft("hello");

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_draft().await }
        });
        wait_until_sending(&session).await;

        // Before the network resolves: draft cleared, pending entry shown.
        assert_eq!(session.draft(), "");
        let pending = session.messages();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].is_pending());
        assert!(pending[0].id.is_local());
        assert!(!session.can_send());

        gate.notify_one();
        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, SendOutcome::Sent(ref m) if m.id.as_str() == "900"));

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_str(), "900");
        assert_eq!(messages[0].status, MessageStatus::Delivered);
        assert!(session.can_send());

        let events = drain(&mut rx);
        assert!(events.contains(&ChatEvent::ScrollToBottom { animated: true }));
        assert_eq!(events.first(), Some(&ChatEvent::SendingChanged { in_flight: true }));
        assert!(events.contains(&ChatEvent::SendingChanged { in_flight: false }));
        assert_eq!(alerts(&events), 0);
    }

    #[tokio::test]
    async fn test_send_failure_rolls_back_and_alerts() {
        let api = Arc::new(FakeApi::new());
        api.push_send(Err(ApiError::Network("connection reset".into())));
        let (session, mut rx) = session_with(api.clone());
        session.set_draft("hello");

        let err = session.send_draft().await.unwrap_err();
        assert!(matches!(err, ChatError::Api(ApiError::Network(_))));

        assert!(session.messages().is_empty());
        assert!(!session.is_sending());
        // Typed text is not restored.
        assert_eq!(session.draft(), "");

        let events = drain(&mut rx);
        assert_eq!(alerts(&events), 1);
    }

    #[tokio::test]
    async fn test_api_rejection_rolls_back_with_server_message() {
        let api = Arc::new(FakeApi::new());
        api.push_send(Err(ApiError::Rejected {
            message: "Recipient not found".into(),
            errors: None,
        }));
        let (session, mut rx) = session_with(api.clone());

        assert!(session.send_text("hi").await.is_err());
        assert!(session.messages().is_empty());
        let events = drain(&mut rx);
        assert!(events.contains(&ChatEvent::Alert {
            title: "Message not sent".into(),
            message: "Recipient not found".into(),
        }));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_network() {
        let api = Arc::new(FakeApi::new());
        let (session, _rx) = session_with(api.clone());

        for text in ["", "   ", "\n\t"] {
            let outcome = session.send_text(text).await.unwrap();
            assert_eq!(outcome, SendOutcome::Rejected(RejectReason::EmptyText));
        }
        assert_eq!(api.sent_count(), 0);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_conversation_rejects_send() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Blocked,
            vec![remote("1", "bye", 0)],
        )));
        let (session, mut rx) = session_with(api.clone());

        session.load(true).await.unwrap();
        assert!(session.is_blocked());
        assert!(drain(&mut rx).contains(&ChatEvent::Blocked));

        let before = session.messages();
        let outcome = session.send_text("hello?").await.unwrap();
        assert_eq!(outcome, SendOutcome::Rejected(RejectReason::Blocked));
        assert_eq!(session.messages(), before);
        assert_eq!(api.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_second_send_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        api.push_send(Ok(message("900", Sender::Local, "first", 0)));
        let (session, _rx) = session_with(api.clone());

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("first").await }
        });
        wait_until_sending(&session).await;

        let outcome = session.send_text("second").await.unwrap();
        assert_eq!(outcome, SendOutcome::Rejected(RejectReason::InFlight));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(api.sent_count(), 1);

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert!(session.can_send());
    }

    #[tokio::test]
    async fn test_initial_load_shows_loader_and_scrolls() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "Thanks for applying", 0)],
        )));
        let (session, mut rx) = session_with(api.clone());
        // Even when scrolled away, the initial load lands at the bottom.
        session.on_scroll(3000.0, 0.0, 600.0);

        let outcome = session.load(true).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: true
            }
        );
        assert_eq!(session.conversation_id(), Some("31".into()));

        let events = drain(&mut rx);
        assert_eq!(events[0], ChatEvent::LoadingChanged { loading: true });
        assert_eq!(events[1], ChatEvent::LoadingChanged { loading: false });
        assert!(events.contains(&ChatEvent::ConversationResolved {
            conversation_id: "31".into()
        }));
        assert!(events.contains(&ChatEvent::ScrollToBottom { animated: false }));

        // The first fetch looked the thread up by application.
        let query = api.queries.lock().unwrap()[0].clone();
        assert_eq!(query.application_id, Some("12".into()));
        assert_eq!(query.conversation_id, None);
        // Later fetches use the resolved id.
        session.load(false).await.unwrap();
        let query = api.last_query().unwrap();
        assert_eq!(query.conversation_id, Some("31".into()));
        assert_eq!(query.application_id, None);
    }

    #[tokio::test]
    async fn test_poll_with_new_message_scrolls_when_near_bottom() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)])));
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), remote("2", "b", 1)],
        )));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        assert!(session.on_scroll(1000.0, 450.0, 500.0));
        let outcome = session.load(false).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: true
            }
        );
        let events = drain(&mut rx);
        assert!(events.contains(&ChatEvent::ScrollToBottom { animated: true }));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::LoadingChanged { .. })));
    }

    #[tokio::test]
    async fn test_poll_with_new_message_does_not_scroll_when_reading_history() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)])));
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), remote("2", "b", 1)],
        )));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        assert!(!session.on_scroll(1000.0, 100.0, 500.0));
        let outcome = session.load(false).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: false
            }
        );
        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::ScrollToBottom { .. })));
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_scrolls_for_remote_message_behind_pending_send() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)])));
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), remote("3", "c", 2)],
        )));
        api.push_send(Ok(message("900", Sender::Local, "hello", 3)));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("hello").await }
        });
        wait_until_sending(&session).await;
        drain(&mut rx);

        let outcome = session.load(false).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: true
            }
        );
        assert!(session.messages().last().unwrap().is_pending());
        assert!(drain(&mut rx).contains(&ChatEvent::ScrollToBottom { animated: true }));

        gate.notify_one();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_poll_scrolls_for_remote_message_behind_unechoed_send() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)])));
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), remote("3", "c", 2)],
        )));
        api.push_send(Ok(message("900", Sender::Local, "hello", 1)));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        session.send_text("hello").await.unwrap();
        drain(&mut rx);

        // The snapshot does not echo "900" yet, so it stays at the tail.
        let outcome = session.load(false).await.unwrap();
        let ids: Vec<String> = session.messages().into_iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec!["1", "3", "900"]);
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: true
            }
        );
    }

    #[tokio::test]
    async fn test_scroll_decision_uses_position_at_poll_start() {
        let fetch_gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::with_fetch_gate(fetch_gate.clone()));
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), remote("2", "b", 1)],
        )));
        let (session, mut rx) = session_with(api.clone());
        assert!(session.is_near_bottom());

        let poll = tokio::spawn({
            let session = session.clone();
            async move { session.load(false).await }
        });
        while api.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }

        // The user scrolls up while the request is in flight.
        assert!(!session.on_scroll(2000.0, 100.0, 500.0));
        fetch_gate.notify_one();

        let outcome = poll.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: true,
                scrolled: true
            }
        );
        assert!(drain(&mut rx).contains(&ChatEvent::ScrollToBottom { animated: true }));
    }

    #[tokio::test]
    async fn test_poll_without_new_messages_does_not_scroll() {
        let api = Arc::new(FakeApi::new());
        api.set_fallback(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)]));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        let outcome = session.load(false).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                new_messages: false,
                scrolled: false
            }
        );
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_state() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![remote("1", "a", 0)])));
        api.push_snapshot(Err(ApiError::Network("timeout".into())));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        assert!(session.load(false).await.is_err());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(alerts(&drain(&mut rx)), 0);
    }

    #[tokio::test]
    async fn test_poll_racing_send_does_not_duplicate() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        let echoed = message("900", Sender::Local, "hello", 1);
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "a", 0), echoed.clone()],
        )));
        api.push_send(Ok(echoed));
        let (session, _rx) = session_with(api.clone());

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("hello").await }
        });
        wait_until_sending(&session).await;

        // The refetch already includes the message being sent.
        session.load(false).await.unwrap();
        assert_eq!(session.messages().len(), 3);

        gate.notify_one();
        task.await.unwrap().unwrap();

        let ids: Vec<String> = session.messages().into_iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec!["1".to_string(), "900".to_string()]);
    }

    #[tokio::test]
    async fn test_first_send_resolves_conversation() {
        let api = Arc::new(FakeApi::new());
        api.push_send(Ok(message("900", Sender::Local, "hello", 0)));
        let (session, mut rx) = session_with(api.clone());
        assert_eq!(session.conversation_id(), None);

        session.send_text("hello").await.unwrap();
        assert_eq!(session.conversation_id(), Some("31".into()));
        assert!(drain(&mut rx).contains(&ChatEvent::ConversationResolved {
            conversation_id: "31".into()
        }));

        let request = api.sent.lock().unwrap()[0].clone();
        assert_eq!(request.conversation_id, None);
        assert_eq!(request.application_id, Some("12".into()));
        assert_eq!(request.recipient_id, UserId::from("7"));
    }

    #[tokio::test]
    async fn test_file_send_shows_pending_metadata() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        let mut confirmed = message("901", Sender::Local, "", 0);
        confirmed.kind = MessageKind::File;
        confirmed.text = None;
        confirmed.file = Some(hirechat_shared::FileMeta {
            file_name: "cv.pdf".into(),
            size_bytes: 2048,
            mime_type: Some("application/pdf".into()),
            url: Some("https://cdn.test/cv.pdf".into()),
        });
        api.push_send(Ok(confirmed));
        let (session, _rx) = session_with(api.clone());

        let picked = PickedFile {
            path: "/tmp/cv.pdf".into(),
            file_name: "cv.pdf".into(),
            size_bytes: 2048,
            mime_type: Some("application/pdf".into()),
        };
        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_file(picked).await }
        });
        wait_until_sending(&session).await;

        let pending = session.messages();
        assert_eq!(pending[0].kind, MessageKind::File);
        let meta = pending[0].file.as_ref().unwrap();
        assert_eq!(meta.file_name, "cv.pdf");
        assert_eq!(meta.size_bytes, 2048);

        gate.notify_one();
        task.await.unwrap().unwrap();
        let stored = session.messages();
        assert_eq!(stored[0].id.as_str(), "901");
        assert!(stored[0].file.as_ref().unwrap().url.is_some());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_locally() {
        let api = Arc::new(FakeApi::new());
        let (session, mut rx) = session_with(api.clone());

        let outcome = session
            .send_file(PickedFile {
                path: "/tmp/video.mp4".into(),
                file_name: "video.mp4".into(),
                size_bytes: MAX_FILE_SIZE + 1,
                mime_type: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Rejected(RejectReason::FileTooLarge));
        assert_eq!(api.sent_count(), 0);
        assert_eq!(alerts(&drain(&mut rx)), 1);
    }

    #[tokio::test]
    async fn test_block_sets_status_and_disables_send() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![])));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        session.block().await.unwrap();
        assert!(session.is_blocked());
        assert!(!session.can_send());
        assert!(drain(&mut rx).contains(&ChatEvent::Blocked));

        // Blocking again is a no-op.
        session.block().await.unwrap();
        assert_eq!(api.blocks.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_block_requires_known_conversation() {
        let api = Arc::new(FakeApi::new());
        let (session, mut rx) = session_with(api.clone());

        let err = session.block().await.unwrap_err();
        assert!(matches!(err, ChatError::ConversationUnknown));
        assert_eq!(alerts(&drain(&mut rx)), 1);
        assert!(!session.is_blocked());
    }

    #[tokio::test]
    async fn test_block_failure_alerts() {
        let api = Arc::new(FakeApi::new());
        api.push_snapshot(Ok(snapshot(ConversationStatus::Normal, vec![])));
        api.set_block(Err(ApiError::Rejected {
            message: "Not allowed".into(),
            errors: None,
        }));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        assert!(session.block().await.is_err());
        assert!(!session.is_blocked());
        assert_eq!(alerts(&drain(&mut rx)), 1);
    }

    #[tokio::test]
    async fn test_open_attachment_without_url_alerts() {
        let api = Arc::new(FakeApi::new());
        let mut file_msg = remote("5", "", 0);
        file_msg.kind = MessageKind::File;
        file_msg.file = Some(hirechat_shared::FileMeta {
            file_name: "cv.pdf".into(),
            size_bytes: 10,
            mime_type: None,
            url: None,
        });
        api.push_snapshot(Ok(snapshot(
            ConversationStatus::Normal,
            vec![remote("1", "text", 0), file_msg],
        )));
        let (session, mut rx) = session_with(api.clone());
        session.load(true).await.unwrap();
        drain(&mut rx);

        struct NeverOpener;
        impl FileOpener for NeverOpener {
            fn show_image(&self, _url: &str) {
                panic!("must not open");
            }
            fn open_in_browser(&self, _url: &str) -> Result<(), crate::viewer::OpenError> {
                panic!("must not open");
            }
            fn open_with_system(&self, _url: &str) -> Result<(), crate::viewer::OpenError> {
                panic!("must not open");
            }
        }

        let err = session.open_attachment(&"5".into(), &NeverOpener).unwrap_err();
        assert!(matches!(err, ChatError::MissingFileUrl(_)));
        assert_eq!(alerts(&drain(&mut rx)), 1);

        let err = session.open_attachment(&"1".into(), &NeverOpener).unwrap_err();
        assert!(matches!(err, ChatError::NotAFile(_)));
    }

    #[tokio::test]
    async fn test_responses_after_close_are_dropped() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(FakeApi::gated(gate.clone()));
        api.push_send(Ok(message("900", Sender::Local, "hello", 0)));
        let (session, _rx) = session_with(api.clone());

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("hello").await }
        });
        wait_until_sending(&session).await;

        session.close();
        gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap(), SendOutcome::Abandoned);
        assert!(session.messages()[0].is_pending());

        assert!(matches!(session.load(false).await, Err(ChatError::SessionClosed)));
        assert_eq!(
            session.send_text("again").await.unwrap(),
            SendOutcome::Rejected(RejectReason::Closed)
        );
    }
}
