use std::collections::{HashMap, HashSet};

use hirechat_shared::{Message, MessageId, MessageStatus};
use tracing::debug;

use crate::error::{Result, StoreError};

/// What a [`MessageStore::replace_all`] changed at the tail of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Id of the last message held before the merge.
    pub previous_last: Option<MessageId>,
    /// Id of the last message of the server snapshot itself.
    pub snapshot_last: Option<MessageId>,
    /// Id of the last message after the merge, local entries included.
    pub current_last: Option<MessageId>,
    /// Local entries carried over because the snapshot did not contain them.
    pub kept_local: usize,
}

impl ReplaceOutcome {
    /// Whether new messages arrived: the snapshot ends on a different
    /// message than the one the store ended on. Local entries carried over
    /// after the snapshot do not hide a new server message.
    pub fn has_new_tail(&self) -> bool {
        self.snapshot_last.is_some() && self.snapshot_last != self.previous_last
    }
}

/// How a pending entry was reconciled by [`MessageStore::confirm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The pending entry was swapped for the server message in place.
    Replaced,
    /// The server message was already present (a refetch raced the send);
    /// the pending entry was dropped and the existing entry updated.
    Deduplicated,
    /// No pending entry was found; the server message was appended.
    Appended,
}

/// Ordered messages of one conversation.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    /// Confirmed messages no server snapshot has contained yet.
    unechoed: HashSet<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_id(&self) -> Option<&MessageId> {
        self.messages.last().map(|m| &m.id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.position(id).is_some()
    }

    /// Number of entries still waiting for server confirmation.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.unechoed.clear();
    }

    /// Merge a full server snapshot into the store.
    ///
    /// The snapshot becomes the new base, de-duplicated by id (a later
    /// occurrence overwrites an earlier one in place).  Local entries the
    /// snapshot does not know about survive after it, in their previous
    /// order: pending sends, and confirmed sends the server has not echoed
    /// in any snapshot yet.
    pub fn replace_all(&mut self, snapshot: Vec<Message>) -> ReplaceOutcome {
        let previous_last = self.last_id().cloned();

        let mut merged: Vec<Message> = Vec::with_capacity(snapshot.len());
        let mut index: HashMap<MessageId, usize> = HashMap::with_capacity(snapshot.len());
        for message in snapshot {
            match index.get(&message.id) {
                Some(&i) => merged[i] = message,
                None => {
                    index.insert(message.id.clone(), merged.len());
                    merged.push(message);
                }
            }
        }

        let snapshot_last = merged.last().map(|m| m.id.clone());
        self.unechoed.retain(|id| !index.contains_key(id));

        let mut kept_local = 0;
        for message in self.messages.drain(..) {
            if index.contains_key(&message.id) {
                continue;
            }
            if message.is_pending() || self.unechoed.contains(&message.id) {
                merged.push(message);
                kept_local += 1;
            }
        }

        self.messages = merged;

        let outcome = ReplaceOutcome {
            previous_last,
            snapshot_last,
            current_last: self.last_id().cloned(),
            kept_local,
        };
        debug!(
            total = self.messages.len(),
            kept_local,
            new_tail = outcome.has_new_tail(),
            "Merged server snapshot"
        );
        outcome
    }

    /// Append an unconfirmed outgoing message. Its status is forced to
    /// [`MessageStatus::Sending`].
    pub fn append_pending(&mut self, mut message: Message) -> Result<MessageId> {
        if self.contains(&message.id) {
            return Err(StoreError::DuplicateId(message.id));
        }
        message.status = MessageStatus::Sending;
        let id = message.id.clone();
        self.messages.push(message);
        Ok(id)
    }

    /// Replace the pending entry `pending_id` with the server's copy.
    ///
    /// Never creates a second entry for the same server id, whatever order
    /// the confirmation and a racing [`replace_all`](Self::replace_all)
    /// arrived in.
    pub fn confirm(&mut self, pending_id: &MessageId, mut confirmed: Message) -> Confirmation {
        if confirmed.status == MessageStatus::Sending {
            confirmed.status = MessageStatus::Sent;
        }

        let server_id = confirmed.id.clone();
        let pending_pos = self
            .position(pending_id)
            .filter(|&i| self.messages[i].is_pending());
        let existing_pos = if &server_id == pending_id {
            None
        } else {
            self.position(&server_id)
        };

        let result = match (pending_pos, existing_pos) {
            (Some(p), None) => {
                self.messages[p] = confirmed;
                self.unechoed.insert(server_id.clone());
                Confirmation::Replaced
            }
            (Some(p), Some(e)) => {
                self.messages[e] = confirmed;
                self.messages.remove(p);
                Confirmation::Deduplicated
            }
            (None, Some(e)) => {
                self.messages[e] = confirmed;
                Confirmation::Deduplicated
            }
            (None, None) => {
                // Covers the degenerate case of a server echoing the local id.
                if let Some(i) = self.position(&server_id) {
                    self.messages[i] = confirmed;
                } else {
                    self.messages.push(confirmed);
                }
                self.unechoed.insert(server_id.clone());
                Confirmation::Appended
            }
        };

        debug!(
            pending = %pending_id,
            server = %server_id,
            outcome = ?result,
            "Confirmed message"
        );
        result
    }

    /// Remove a pending entry after a failed send.
    ///
    /// Returns `false` if no pending entry has that id; confirmed messages
    /// are never removed.
    pub fn rollback(&mut self, pending_id: &MessageId) -> bool {
        match self.position(pending_id) {
            Some(i) if self.messages[i].is_pending() => {
                self.messages.remove(i);
                debug!(pending = %pending_id, "Rolled back pending message");
                true
            }
            _ => false,
        }
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }
}
