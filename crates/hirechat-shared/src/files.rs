//! Attachment classification.
//!
//! Decides how an attachment should be presented from its MIME type, or,
//! when the MIME type says nothing useful, from the extension of its file
//! name or URL.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Document,
    Unknown,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["doc", "docx", "txt", "rtf", "odt"];

/// Classify an attachment.
///
/// An explicit MIME type wins; otherwise the extension of `file_name` is
/// used, then the extension of the last path segment of `url`.
pub fn classify(url: Option<&str>, mime_type: Option<&str>, file_name: Option<&str>) -> FileKind {
    if let Some(kind) = mime_type.and_then(kind_from_mime) {
        return kind;
    }

    file_name
        .and_then(extension)
        .and_then(kind_from_extension)
        .or_else(|| url.and_then(url_extension).and_then(kind_from_extension))
        .unwrap_or(FileKind::Unknown)
}

fn kind_from_mime(mime: &str) -> Option<FileKind> {
    let mime = mime.trim().to_ascii_lowercase();
    if mime.starts_with("image/") {
        Some(FileKind::Image)
    } else if mime == "application/pdf" {
        Some(FileKind::Pdf)
    } else if mime.contains("document") || mime.contains("word") {
        Some(FileKind::Document)
    } else {
        None
    }
}

fn kind_from_extension(ext: String) -> Option<FileKind> {
    let ext = ext.as_str();
    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(FileKind::Image)
    } else if ext == "pdf" {
        Some(FileKind::Pdf)
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        Some(FileKind::Document)
    } else {
        None
    }
}

/// Lower-cased extension of a file name, if it has one.
fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn url_extension(url: &str) -> Option<String> {
    // Query string and fragment never carry the extension.
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    extension(last_segment)
}
