//! Opening attachments.
//!
//! Images are shown in an in-app viewer, PDFs go to the browser, and
//! everything else is handed to the operating system, with the browser as
//! the fallback when no local application claims the file.  The platform
//! side is abstracted behind [`FileOpener`].

use thiserror::Error;
use tracing::{debug, warn};

use hirechat_shared::{classify, FileKind, FileMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStrategy {
    /// Modal image viewer inside the app.
    InAppImage,
    /// External or in-app browser.
    Browser,
    /// Default application registered with the OS.
    SystemHandler,
}

impl ViewStrategy {
    pub fn for_kind(kind: FileKind) -> Self {
        match kind {
            FileKind::Image => ViewStrategy::InAppImage,
            FileKind::Pdf => ViewStrategy::Browser,
            FileKind::Document | FileKind::Unknown => ViewStrategy::SystemHandler,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// No installed application can handle the file.
    #[error("No application can open {0}")]
    Unsupported(String),

    #[error("Failed to open {url}: {reason}")]
    Failed { url: String, reason: String },
}

/// Platform integration used to display attachments.
pub trait FileOpener: Send + Sync {
    /// Present the image viewer for `url`.
    fn show_image(&self, url: &str);

    fn open_in_browser(&self, url: &str) -> Result<(), OpenError>;

    fn open_with_system(&self, url: &str) -> Result<(), OpenError>;
}

/// Open an attachment and return the strategy that was actually used.
///
/// The caller must make sure `file.url` is present.
pub fn open_file(file: &FileMeta, opener: &dyn FileOpener) -> Result<ViewStrategy, OpenError> {
    let url = file.url.as_deref().unwrap_or_default();
    let kind = classify(Some(url), file.mime_type.as_deref(), Some(&file.file_name));
    let strategy = ViewStrategy::for_kind(kind);
    debug!(url, ?kind, ?strategy, "Opening attachment");

    match strategy {
        ViewStrategy::InAppImage => {
            opener.show_image(url);
            Ok(ViewStrategy::InAppImage)
        }
        ViewStrategy::Browser => {
            opener.open_in_browser(url)?;
            Ok(ViewStrategy::Browser)
        }
        ViewStrategy::SystemHandler => match opener.open_with_system(url) {
            Ok(()) => Ok(ViewStrategy::SystemHandler),
            Err(OpenError::Unsupported(_)) => {
                warn!(url, "No local handler, falling back to browser");
                opener.open_in_browser(url)?;
                Ok(ViewStrategy::Browser)
            }
            Err(e) => Err(e),
        },
    }
}

// ---------------------------------------------------------------------------
// In-app image viewer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLoadState {
    Loading,
    Loaded,
    /// Rendered inline as "failed to load"; the viewer stays open.
    Failed { reason: String },
}

/// State of the modal image viewer.
#[derive(Debug, Clone)]
pub struct ImageViewer {
    url: String,
    state: ImageLoadState,
}

impl ImageViewer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ImageLoadState::Loading,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &ImageLoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ImageLoadState::Loading
    }

    pub fn on_loaded(&mut self) {
        if self.is_loading() {
            self.state = ImageLoadState::Loaded;
        }
    }

    pub fn on_error(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(url = %self.url, %reason, "Image failed to load");
        self.state = ImageLoadState::Failed { reason };
    }

    /// Start loading again after a failure.
    pub fn retry(&mut self) {
        self.state = ImageLoadState::Loading;
    }
}
