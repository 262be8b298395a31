use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::guard::RefreshGuard;
use super::{
    AccessTokenProvider, CredentialScope, TokenAuthority, TokenFuture, STANDARD_SAFETY_MARGIN,
};
use crate::cache::Cache;
use crate::client::WechatClient;
use crate::types::{AppId, AppSecret};

/// Access token from `GET /cgi-bin/token`, shared through the cache.
///
/// Each call to the issuer invalidates the previously issued token, so a
/// cache miss is refreshed under a per-instance lock: concurrent callers wait
/// for the first fetch and then read its result from the cache.
pub struct DefaultAccessToken {
    scope: CredentialScope,
    authority: TokenAuthority,
    guard: RefreshGuard,
}

impl fmt::Debug for DefaultAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAccessToken")
            .field("scope", &self.scope)
            .field("cache_key", &self.guard.key())
            .finish_non_exhaustive()
    }
}

impl DefaultAccessToken {
    pub fn new(
        appid: AppId,
        secret: AppSecret,
        cache_key_prefix: impl Into<String>,
        cache: Arc<dyn Cache>,
        client: WechatClient,
    ) -> Self {
        let scope = CredentialScope::standard(&appid, &secret, cache_key_prefix);
        let guard = RefreshGuard::new(cache, scope.cache_key(), STANDARD_SAFETY_MARGIN);
        Self {
            scope,
            authority: TokenAuthority::new(client),
            guard,
        }
    }

    pub fn scope(&self) -> &CredentialScope {
        &self.scope
    }

    pub fn cache_key(&self) -> &str {
        self.guard.key()
    }
}

impl AccessTokenProvider for DefaultAccessToken {
    fn get_access_token_with_cancel<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a> {
        Box::pin(self.guard.get_or_refresh(cancel, move || async move {
            let response = self.authority.fetch_token(&self.scope, cancel).await?;
            Ok(response.into_issued())
        }))
    }
}
