use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No connectivity, timeout, or any other transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with `success: false` or an error status.
    #[error("Request rejected: {message}")]
    Rejected {
        message: String,
        errors: Option<serde_json::Value>,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built (bad header or MIME type, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text suitable for a user-facing alert.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Io(e) => format!("Could not read the file: {e}"),
            ApiError::Decode(_) | ApiError::InvalidUrl(_) | ApiError::InvalidRequest(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if e.is_builder() {
            ApiError::InvalidRequest(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
