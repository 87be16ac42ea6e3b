//! # hirechat-shared
//!
//! Domain types shared by every hirechat crate: message and conversation
//! records, identifier newtypes, attachment classification and tuning
//! constants.

pub mod constants;
pub mod files;
pub mod types;

pub use files::{classify, FileKind};
pub use types::*;
