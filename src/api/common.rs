//! Common API response primitives
//!
//! Most WeChat APIs return JSON responses with common `errcode` / `errmsg` fields.
//!
//! - [`WechatApiResponse`] trait for uniform errcode/errmsg checking
//! - [`ApiResponseBase`] struct for simple error-only responses
//!
//! ```rust
//! use wechat_sdk::api::common::{WechatApiResponse, ApiResponseBase};
//!
//! let json = r#"{"errcode": 0, "errmsg": "ok"}"#;
//! let resp: ApiResponseBase = serde_json::from_str(json).unwrap();
//! assert!(resp.check().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::WechatError;

/// Trait for WeChat API responses that carry `errcode` / `errmsg`.
pub trait WechatApiResponse {
    /// `0` indicates success; any other value is an error.
    fn errcode(&self) -> i32;

    fn errmsg(&self) -> &str;

    /// Returns `WechatError::Api` unless `errcode == 0`.
    fn check(&self) -> Result<(), WechatError> {
        WechatError::check_api(self.errcode(), self.errmsg())
    }

    fn is_success(&self) -> bool {
        self.errcode() == 0
    }
}

/// Minimal API response carrying only `errcode` and `errmsg`.
///
/// ```rust
/// use wechat_sdk::api::common::{ApiResponseBase, WechatApiResponse};
///
/// let json = r#"{"errcode": 40013, "errmsg": "invalid appid"}"#;
/// let resp: ApiResponseBase = serde_json::from_str(json).unwrap();
/// assert!(!resp.is_success());
/// assert!(resp.check().is_err());
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponseBase {
    #[serde(default)]
    pub errcode: i32,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiResponseBase {
    pub fn success() -> Self {
        Self {
            errcode: 0,
            errmsg: "ok".to_string(),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            errcode: code,
            errmsg: message.into(),
        }
    }
}

impl WechatApiResponse for ApiResponseBase {
    fn errcode(&self) -> i32 {
        self.errcode
    }

    fn errmsg(&self) -> &str {
        &self.errmsg
    }
}
