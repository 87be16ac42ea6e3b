//! Plain-text rendering of messages, events and attachments.

use std::collections::HashSet;

use chrono::Local;

use hirechat_client::viewer::{FileOpener, OpenError};
use hirechat_shared::{Message, MessageId, MessageKind, Participant, Sender};

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

pub fn format_message(message: &Message, participant: Option<&Participant>) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let who = match message.sender {
        Sender::Local => "you",
        Sender::Remote => participant
            .map(|p| p.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("them"),
    };

    let body = match (&message.kind, &message.file) {
        (MessageKind::File, Some(file)) => format!(
            "[file] {} ({}) #{}",
            file.file_name,
            format_size(file.size_bytes),
            message.id
        ),
        _ => message.text.clone().unwrap_or_default(),
    };
    format!("[{time}] {who}: {body}")
}

/// Remembers which confirmed messages were already printed so each list
/// change only prints what is new.
#[derive(Debug, Default)]
pub struct Transcript {
    printed: HashSet<MessageId>,
}

impl Transcript {
    pub fn reset(&mut self) {
        self.printed.clear();
    }

    /// Lines for messages not printed before. Pending entries are skipped
    /// until the server confirms them.
    pub fn new_lines(&mut self, messages: &[Message], participant: Option<&Participant>) -> Vec<String> {
        messages
            .iter()
            .filter(|m| !m.is_pending())
            .filter(|m| self.printed.insert(m.id.clone()))
            .map(|m| format_message(m, participant))
            .collect()
    }
}

/// Terminal stand-in for the platform viewers: prints where the file would
/// be shown. There is no desktop integration, so the system handler always
/// defers to the browser.
pub struct TerminalOpener;

impl FileOpener for TerminalOpener {
    fn show_image(&self, url: &str) {
        println!("[image viewer] {url}");
    }

    fn open_in_browser(&self, url: &str) -> Result<(), OpenError> {
        println!("[browser] {url}");
        Ok(())
    }

    fn open_with_system(&self, url: &str) -> Result<(), OpenError> {
        Err(OpenError::Unsupported(url.to_string()))
    }
}
