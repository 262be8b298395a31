//! Access token acquisition and caching
//!
//! Every API wrapper depends on [`AccessTokenProvider`]: "give me a currently
//! valid token or an error". Three refresh policies implement it:
//!
//! | Provider | Endpoint | Local lock | Safety margin |
//! |----------|----------|------------|---------------|
//! | [`DefaultAccessToken`] | `GET /cgi-bin/token` | double-checked | 1500s |
//! | [`StableAccessToken`] | `POST /cgi-bin/stable_token` | none | 300s |
//! | [`WorkAccessToken`] | `GET /cgi-bin/gettoken` (WeCom) | double-checked | 1500s |
//!
//! Tokens live in a shared [`Cache`](crate::cache::Cache) under
//! `{prefix}_{access_token|stable_access_token}_{principal}` with the issuer's
//! `expires_in` minus the safety margin as TTL. A failed fetch is never
//! written to the cache.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wechat_sdk::cache::MemoryCache;
//! use wechat_sdk::client::WechatClient;
//! use wechat_sdk::credential::{AccessTokenProvider, DefaultAccessToken, CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX};
//! use wechat_sdk::types::{AppId, AppSecret};
//!
//! let provider = DefaultAccessToken::new(
//!     AppId::new("wx1234567890abcdef")?,
//!     AppSecret::new("secret")?,
//!     CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX,
//!     Arc::new(MemoryCache::new()),
//!     WechatClient::builder().build()?,
//! );
//! let token = provider.get_access_token().await?;
//! ```

mod authority;
mod default;
mod guard;
mod js_ticket;
mod stable;
mod work;

pub use authority::{TokenAuthority, TokenResponse};
pub use default::DefaultAccessToken;
pub use js_ticket::{DefaultJsTicket, JsTicketProvider, TicketType};
pub use stable::StableAccessToken;
pub use work::WorkAccessToken;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::WechatError;
use crate::types::{AccessToken, AppId, AppSecret, CorpId, CorpSecret};

/// Cache key prefix for official account tokens
pub const CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX: &str = "wechat_officialaccount";
/// Cache key prefix for mini program tokens
pub const CACHE_KEY_MINI_PROGRAM_PREFIX: &str = "wechat_miniprogram";
/// Cache key prefix for WeCom tokens
pub const CACHE_KEY_WORK_PREFIX: &str = "wechat_work";

/// Subtracted from `expires_in` by the locking providers before caching.
pub const STANDARD_SAFETY_MARGIN: Duration = Duration::from_secs(1500);
/// Subtracted from `expires_in` by [`StableAccessToken`] before caching.
pub const STABLE_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// Boxed future resolving to a token string.
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<String, WechatError>> + Send + 'a>>;

/// Source of a currently valid access token.
pub trait AccessTokenProvider: Send + Sync {
    /// Return the cached token, fetching a new one on a miss.
    ///
    /// Cancelling `cancel` aborts a pending lock wait or in-flight request
    /// with [`WechatError::Cancelled`].
    fn get_access_token_with_cancel<'a>(&'a self, cancel: &'a CancellationToken)
        -> TokenFuture<'a>;

    /// Same as [`get_access_token_with_cancel`](Self::get_access_token_with_cancel)
    /// without cancellation.
    fn get_access_token(&self) -> TokenFuture<'_> {
        Box::pin(async move {
            let cancel = CancellationToken::new();
            self.get_access_token_with_cancel(&cancel).await
        })
    }
}

impl<T: AccessTokenProvider + ?Sized> AccessTokenProvider for Arc<T> {
    fn get_access_token_with_cancel<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a> {
        (**self).get_access_token_with_cancel(cancel)
    }
}

/// Which token endpoint a [`CredentialScope`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssuerKind {
    /// `GET /cgi-bin/token`
    StandardApp,
    /// `POST /cgi-bin/stable_token`
    StableApp,
    /// WeCom `GET /cgi-bin/gettoken`
    EnterpriseApp,
}

impl IssuerKind {
    fn qualifier(self) -> &'static str {
        match self {
            IssuerKind::StandardApp | IssuerKind::EnterpriseApp => "access_token",
            IssuerKind::StableApp => "stable_access_token",
        }
    }
}

/// Whose token a provider manages.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialScope {
    kind: IssuerKind,
    principal_id: String,
    secret: String,
    cache_key_prefix: String,
}

impl fmt::Debug for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialScope")
            .field("kind", &self.kind)
            .field("principal_id", &self.principal_id)
            .field("cache_key_prefix", &self.cache_key_prefix)
            .finish_non_exhaustive()
    }
}

impl CredentialScope {
    pub fn standard(appid: &AppId, secret: &AppSecret, cache_key_prefix: impl Into<String>) -> Self {
        Self::new(
            IssuerKind::StandardApp,
            appid.as_str(),
            secret.as_str(),
            cache_key_prefix,
        )
    }

    pub fn stable(appid: &AppId, secret: &AppSecret, cache_key_prefix: impl Into<String>) -> Self {
        Self::new(
            IssuerKind::StableApp,
            appid.as_str(),
            secret.as_str(),
            cache_key_prefix,
        )
    }

    pub fn enterprise(
        corpid: &CorpId,
        secret: &CorpSecret,
        cache_key_prefix: impl Into<String>,
    ) -> Self {
        Self::new(
            IssuerKind::EnterpriseApp,
            corpid.as_str(),
            secret.as_str(),
            cache_key_prefix,
        )
    }

    fn new(
        kind: IssuerKind,
        principal_id: &str,
        secret: &str,
        cache_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            principal_id: principal_id.to_string(),
            secret: secret.to_string(),
            cache_key_prefix: cache_key_prefix.into(),
        }
    }

    pub fn kind(&self) -> IssuerKind {
        self.kind
    }

    /// AppID or CorpID
    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    pub fn cache_key_prefix(&self) -> &str {
        &self.cache_key_prefix
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    /// `{prefix}_{access_token|stable_access_token}_{principal_id}`
    pub fn cache_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.cache_key_prefix,
            self.kind.qualifier(),
            self.principal_id
        )
    }
}

/// Provider that always returns the same token.
///
/// For tokens whose lifecycle is managed elsewhere, e.g. an authorizer token
/// handed over by an open platform component.
#[derive(Clone)]
pub struct StaticAccessToken {
    token: AccessToken,
}

impl fmt::Debug for StaticAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAccessToken").finish_non_exhaustive()
    }
}

impl StaticAccessToken {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

impl AccessTokenProvider for StaticAccessToken {
    fn get_access_token_with_cancel<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(WechatError::Cancelled);
            }
            Ok(self.token.as_str().to_string())
        })
    }
}

/// Run `fut` unless `cancel` fires first; the losing future is dropped.
pub(crate) async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, WechatError>
where
    F: Future<Output = Result<T, WechatError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WechatError::Cancelled),
        result = fut => result,
    }
}
