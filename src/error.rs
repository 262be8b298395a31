use thiserror::Error;

use crate::cache::CacheError;
use crate::types::AccessToken;

/// Transport-level failures talking to a WeChat endpoint
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// WeChat SDK error types
#[derive(Debug, Error)]
pub enum WechatError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    /// The token was fetched but could not be written back to the cache.
    ///
    /// The fetch itself succeeded, so the token is still usable; see
    /// [`WechatError::recovered_token`].
    #[error("failed to cache access token: {source}")]
    CacheWrite {
        token: AccessToken,
        #[source]
        source: CacheError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for WechatError {
    fn from(e: reqwest::Error) -> Self {
        WechatError::Http(HttpError::Reqwest(e))
    }
}

impl WechatError {
    /// Map a WeChat `errcode` / `errmsg` pair to a result.
    ///
    /// `0` is success, anything else becomes [`WechatError::Api`].
    pub fn check_api(code: i32, message: &str) -> Result<(), WechatError> {
        if code == 0 {
            return Ok(());
        }
        Err(WechatError::Api {
            code,
            message: message.to_string(),
        })
    }

    /// The API error code, if this is a [`WechatError::Api`].
    pub fn api_code(&self) -> Option<i32> {
        match self {
            WechatError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Token that was obtained before a cache write failed.
    pub fn recovered_token(&self) -> Option<&str> {
        match self {
            WechatError::CacheWrite { token, .. } => Some(token.as_str()),
            _ => None,
        }
    }
}
