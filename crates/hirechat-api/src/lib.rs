//! REST collaborator of the chat component.
//!
//! [`ChatApi`] is the contract the session depends on; [`HttpChatApi`]
//! implements it over HTTP with `reqwest`.

pub mod client;
pub mod error;
pub mod http;
pub mod wire;

pub use client::{ChatApi, MessageQuery, SendBody, SendRequest};
pub use error::ApiError;
pub use http::{HttpChatApi, HttpConfig};
