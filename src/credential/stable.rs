use std::fmt;
use std::sync::Arc;

use log::debug;
use tokio_util::sync::CancellationToken;

use super::guard::{read_cached, store_issued};
use super::{
    AccessTokenProvider, CredentialScope, TokenAuthority, TokenFuture, TokenResponse,
    STABLE_SAFETY_MARGIN,
};
use crate::cache::Cache;
use crate::client::WechatClient;
use crate::error::WechatError;
use crate::types::{AppId, AppSecret};

/// Access token from `POST /cgi-bin/stable_token`.
///
/// The stable endpoint returns the same token to concurrent callers until it
/// expires, so no local lock is taken. Its tokens are isolated from
/// [`DefaultAccessToken`](super::DefaultAccessToken) and use a separate cache
/// key.
pub struct StableAccessToken {
    scope: CredentialScope,
    authority: TokenAuthority,
    cache: Arc<dyn Cache>,
    cache_key: String,
    force_refresh: bool,
}

impl fmt::Debug for StableAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableAccessToken")
            .field("scope", &self.scope)
            .field("cache_key", &self.cache_key)
            .field("force_refresh", &self.force_refresh)
            .finish_non_exhaustive()
    }
}

impl StableAccessToken {
    pub fn new(
        appid: AppId,
        secret: AppSecret,
        cache_key_prefix: impl Into<String>,
        cache: Arc<dyn Cache>,
        client: WechatClient,
    ) -> Self {
        let scope = CredentialScope::stable(&appid, &secret, cache_key_prefix);
        let cache_key = scope.cache_key();
        Self {
            scope,
            authority: TokenAuthority::new(client),
            cache,
            cache_key,
            force_refresh: false,
        }
    }

    /// Send `force_refresh` when the cache misses.
    ///
    /// Default: false
    pub fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Fetch from the issuer, bypassing the cache entirely.
    ///
    /// The cache is neither read nor written, so a forced refresh here
    /// leaves any cached token untouched.
    pub async fn get_access_token_directly(
        &self,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<TokenResponse, WechatError> {
        self.authority
            .fetch_stable_token(&self.scope, force_refresh, cancel)
            .await
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<String, WechatError> {
        if let Some(token) = read_cached(&*self.cache, &self.cache_key).await {
            return Ok(token);
        }

        debug!("[credential] {} missing, fetching stable token", self.cache_key);
        let response = self
            .get_access_token_directly(self.force_refresh, cancel)
            .await?;
        store_issued(
            &*self.cache,
            &self.cache_key,
            response.into_issued(),
            STABLE_SAFETY_MARGIN,
        )
        .await
    }
}

impl AccessTokenProvider for StableAccessToken {
    fn get_access_token_with_cancel<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a> {
        Box::pin(self.fetch(cancel))
    }
}
