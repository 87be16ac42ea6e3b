//! Conversation screen core: keeps one conversation's messages in sync with
//! the backend, sends optimistically, tracks the scroll position and opens
//! attachments.
//!
//! A UI shell creates a [`ChatSession`], starts its [`SyncHandle`], feeds it
//! user input and renders from [`ChatSession::messages`] whenever a
//! [`ChatEvent`] arrives.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod scroll;
pub mod session;
pub mod sync;
pub mod viewer;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use error::{ChatError, RejectReason};
pub use events::ChatEvent;
pub use scroll::ScrollTracker;
pub use session::{ChatSession, LoadOutcome, SendOutcome, SessionTarget};
pub use sync::{start_sync, switch_conversation, SyncHandle};
pub use viewer::{open_file, FileOpener, ImageLoadState, ImageViewer, OpenError, ViewStrategy};
