//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so a development build runs against a local
//! backend with zero configuration.

use std::time::Duration;

use hirechat_api::HttpConfig;
use hirechat_shared::constants::{
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS, NEAR_BOTTOM_THRESHOLD_PX, POLL_INTERVAL_SECS,
};
use hirechat_shared::UserId;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    /// Env: `HIRECHAT_API_URL`
    /// Default: `http://localhost:8000/api/`
    pub api_url: String,

    /// Bearer token for the API.
    /// Env: `HIRECHAT_API_TOKEN`
    /// Default: none (anonymous requests).
    pub api_token: Option<String>,

    /// Account id of the signed-in user, used to align own messages.
    /// Env: `HIRECHAT_USER_ID`
    pub user_id: Option<UserId>,

    /// Delay between background refetches.
    /// Env: `HIRECHAT_POLL_INTERVAL_SECS`
    /// Default: 5 seconds.
    pub poll_interval: Duration,

    /// Distance from the bottom (px) under which new messages auto-scroll.
    /// Env: `HIRECHAT_NEAR_BOTTOM_PX`
    /// Default: `100`
    pub near_bottom_px: f64,

    /// HTTP request timeout.
    /// Env: `HIRECHAT_REQUEST_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            user_id: None,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            near_bottom_px: NEAR_BOTTOM_THRESHOLD_PX,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("HIRECHAT_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url;
        }

        if let Some(token) = lookup("HIRECHAT_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Some(id) = lookup("HIRECHAT_USER_ID") {
            if !id.trim().is_empty() {
                config.user_id = Some(UserId(id.trim().to_string()));
            }
        }

        if let Some(val) = lookup("HIRECHAT_POLL_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.poll_interval = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid HIRECHAT_POLL_INTERVAL_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("HIRECHAT_NEAR_BOTTOM_PX") {
            match val.parse::<f64>() {
                Ok(px) if px.is_finite() && px >= 0.0 => config.near_bottom_px = px,
                _ => tracing::warn!(value = %val, "Invalid HIRECHAT_NEAR_BOTTOM_PX, using default"),
            }
        }

        if let Some(val) = lookup("HIRECHAT_REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid HIRECHAT_REQUEST_TIMEOUT_SECS, using default"
                ),
            }
        }

        config
    }

    /// Settings for the HTTP implementation of the API.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
            local_user: self.user_id.clone(),
            timeout: self.request_timeout,
        }
    }
}
