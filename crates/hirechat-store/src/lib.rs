//! # hirechat-store
//!
//! In-memory message store for a single conversation.
//!
//! The store is owned by the session that displays the conversation and is
//! dropped with it; nothing is persisted.  It keeps messages in
//! chronological order, never holds two entries with the same id, and
//! reconciles server snapshots with locally sent messages by id.

pub mod messages;

mod error;

pub use error::StoreError;
pub use messages::{Confirmation, MessageStore, ReplaceOutcome};
