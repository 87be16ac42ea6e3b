//! # hirechat
//!
//! Terminal client for a single recruiter / job seeker conversation.
//!
//! - keeps the conversation in sync with the backend every few seconds
//! - sends each stdin line as a text message, `/file <path>` as an upload
//! - `/open <id>` resolves how an attachment would be displayed
//! - `/block` blocks the conversation
//!
//! Connection settings come from `HIRECHAT_*` environment variables.

mod commands;
mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use hirechat_api::HttpChatApi;
use hirechat_shared::constants::APP_NAME;
use hirechat_client::{
    logging, start_sync, ChatEvent, ChatSession, ClientConfig, SendOutcome, SessionTarget,
};

use crate::commands::{parse_line, pick_file, Command, HELP};
use crate::render::{TerminalOpener, Transcript};

#[derive(Parser, Debug)]
#[command(name = "hirechat", version)]
#[command(about = "Chat with the other side of a job application", long_about = None)]
#[command(group(
    clap::ArgGroup::new("thread")
        .required(true)
        .multiple(true)
        .args(["conversation", "application"])
))]
struct Args {
    /// Existing conversation id
    #[arg(long)]
    conversation: Option<String>,

    /// Job application the conversation belongs to
    #[arg(long)]
    application: Option<String>,

    /// Job seeker of the application
    #[arg(long)]
    jobseeker: Option<String>,

    /// User id of the other participant
    #[arg(long)]
    recipient: String,
}

impl Args {
    fn target(&self) -> SessionTarget {
        SessionTarget {
            conversation_id: self.conversation.as_deref().map(Into::into),
            application_id: self.application.as_deref().map(Into::into),
            jobseeker_id: self.jobseeker.as_deref().map(Into::into),
            recipient_id: self.recipient.as_str().into(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init();

    let config = ClientConfig::from_env();
    info!(
        api = %config.api_url,
        poll = ?config.poll_interval,
        "Starting {} v{}",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );

    let api = HttpChatApi::new(config.http_config()).context("invalid API configuration")?;
    let (session, mut events) = ChatSession::new(Arc::new(api), &config, args.target());

    // Event printer
    let printer = tokio::spawn({
        let session = session.clone();
        async move {
            let mut transcript = Transcript::default();
            while let Some(event) = events.recv().await {
                match event {
                    ChatEvent::LoadingChanged { loading: true } => println!("Loading conversation..."),
                    ChatEvent::MessagesChanged { count: 0 } => transcript.reset(),
                    ChatEvent::MessagesChanged { .. } => {
                        let participant = session.participant();
                        for line in transcript.new_lines(&session.messages(), participant.as_ref()) {
                            println!("{line}");
                        }
                    }
                    ChatEvent::Alert { title, message } => eprintln!("! {title}: {message}"),
                    ChatEvent::ConversationResolved { conversation_id } => {
                        debug!(%conversation_id, "Conversation id known");
                    }
                    ChatEvent::Blocked => println!("This conversation is blocked."),
                    ChatEvent::LoadingChanged { .. }
                    | ChatEvent::ScrollToBottom { .. }
                    | ChatEvent::SendingChanged { .. } => {}
                }
            }
        }
    });

    let sync = start_sync(session.clone());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match command {
            Command::Nothing => {}
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Text(text) => report(session.send_text(&text).await),
            Command::File(path) => match pick_file(&path).await {
                Ok(file) => report(session.send_file(file).await),
                Err(e) => eprintln!("{e:#}"),
            },
            Command::Open(id) => {
                if let Ok(strategy) = session.open_attachment(&id, &TerminalOpener) {
                    debug!(?strategy, "Attachment opened");
                }
            }
            // Failures are reported through alerts.
            Command::Block => {
                let _ = session.block().await;
            }
        }
    }

    info!("Shutting down");
    sync.stop().await;
    session.close();
    printer.abort();
    Ok(())
}

fn report(result: Result<SendOutcome, hirechat_client::ChatError>) {
    match result {
        Ok(SendOutcome::Rejected(reason)) => eprintln!("Not sent: {reason}"),
        Ok(_) => {}
        // Alerted already.
        Err(e) => debug!(error = %e, "Send failed"),
    }
}
