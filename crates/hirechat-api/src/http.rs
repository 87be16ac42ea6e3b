//! `reqwest` implementation of [`ChatApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use hirechat_shared::constants::{APP_NAME, DEFAULT_REQUEST_TIMEOUT_SECS};
use hirechat_shared::{ConversationId, ConversationSnapshot, Message, Sender, UserId};

use crate::client::{ChatApi, MessageQuery, SendBody, SendRequest};
use crate::error::ApiError;
use crate::wire::{ConversationData, DecodeContext, Envelope, TextMessageBody, WireMessage};

/// Connection settings for [`HttpChatApi`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the REST API, e.g. `https://jobs.example.com/api/`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Account of the signed-in user.
    pub local_user: Option<UserId>,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: hirechat_shared::constants::DEFAULT_API_URL.to_string(),
            token: None,
            local_user: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

pub struct HttpChatApi {
    http: reqwest::Client,
    ctx: DecodeContext,
    token: Option<String>,
}

impl HttpChatApi {
    pub fn new(config: HttpConfig) -> Result<Self, ApiError> {
        // Without the trailing slash `Url::join` would drop the last path segment.
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            ctx: DecodeContext {
                local_user: config.local_user,
                base_url,
            },
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.ctx.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.ctx
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Decode the envelope of any response. Error statuses carrying an envelope
/// keep the server's message; those without one are reported by status.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    match serde_json::from_slice::<Envelope<T>>(&body) {
        Ok(mut envelope) => {
            if !status.is_success() {
                envelope.success = false;
                if envelope.message.is_none() {
                    envelope.message = Some(format!("Server returned {status}"));
                }
            }
            Ok(envelope)
        }
        Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
        Err(_) => Err(ApiError::Rejected {
            message: format!("Server returned {status}"),
            errors: None,
        }),
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn get_conversation_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<ConversationSnapshot, ApiError> {
        let url = self.endpoint("messages/conversation")?;
        let query = query.clone().normalized();
        debug!(?query, "Fetching conversation messages");

        let response = self
            .authorized(self.http.get(url).query(&query))
            .send()
            .await?;
        let envelope: Envelope<ConversationData> = read_envelope(response).await?;
        let snapshot = envelope.into_data()?.into_snapshot(&self.ctx);

        debug!(count = snapshot.messages.len(), "Fetched conversation messages");
        Ok(snapshot)
    }

    async fn send_message(&self, request: SendRequest) -> Result<Message, ApiError> {
        let url = self.endpoint("messages/send")?;
        let message_type = request.body.message_type();

        let builder = match &request.body {
            SendBody::Text(text) => self.http.post(url).json(&TextMessageBody {
                recipient_id: &request.recipient_id,
                application_id: request.application_id.as_ref(),
                conversation_id: request.conversation_id.as_ref(),
                message: text,
                message_type,
            }),
            SendBody::File(file) => {
                let bytes = tokio::fs::read(&file.path).await?;
                let mut part = Part::bytes(bytes).file_name(file.file_name.clone());
                if let Some(mime) = &file.mime_type {
                    part = part.mime_str(mime)?;
                }

                let mut form = Form::new()
                    .text("recipient_id", request.recipient_id.0.clone())
                    .text("message_type", message_type);
                if let Some(application_id) = &request.application_id {
                    form = form.text("application_id", application_id.0.clone());
                }
                if let Some(conversation_id) = &request.conversation_id {
                    form = form.text("conversation_id", conversation_id.0.clone());
                }
                self.http.post(url).multipart(form.part("file", part))
            }
        };

        let response = self.authorized(builder).send().await?;
        let envelope: Envelope<WireMessage> = read_envelope(response).await?;
        let mut message = envelope.into_data()?.into_message(&self.ctx);
        // Whatever the payload says, this is our own message.
        message.sender = Sender::Local;

        info!(
            message_id = %message.id,
            kind = message_type,
            "Message accepted by server"
        );
        Ok(message)
    }

    async fn block_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&format!("messages/conversations/{conversation_id}/block"))?;
        let response = self.authorized(self.http.post(url)).send().await?;
        let envelope: Envelope<serde_json::Value> = read_envelope(response).await?;
        let message = envelope.into_message()?;

        info!(conversation = %conversation_id, "Conversation blocked");
        Ok(message)
    }
}
