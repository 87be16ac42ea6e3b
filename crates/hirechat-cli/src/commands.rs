//! Parsing of stdin lines into chat commands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use hirechat_shared::{MessageId, PickedFile};

pub const HELP: &str = "\
Type a message and press Enter to send it.
  /file <path>   send a file
  /open <id>     open the attachment of message <id>
  /block         block this conversation
  /help          show this help
  /quit          leave (Ctrl+D and Ctrl+C work too)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    File(PathBuf),
    Open(MessageId),
    Block,
    Help,
    Quit,
    /// Blank input.
    Nothing,
}

pub fn parse_line(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Nothing);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Text(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "file" if !arg.is_empty() => Ok(Command::File(PathBuf::from(arg))),
        "file" => bail!("usage: /file <path>"),
        "open" if !arg.is_empty() => Ok(Command::Open(MessageId::from(arg))),
        "open" => bail!("usage: /open <message id>"),
        "block" => Ok(Command::Block),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => bail!("unknown command /{other}, try /help"),
    }
}

/// Describe a file on disk the way a file picker would.
pub async fn pick_file(path: &Path) -> anyhow::Result<PickedFile> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let mime_type = mime_guess::from_path(path).first().map(|m| m.to_string());

    Ok(PickedFile {
        path: path.to_path_buf(),
        file_name,
        size_bytes: metadata.len(),
        mime_type,
    })
}
