use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::guard::RefreshGuard;
use super::{
    AccessTokenProvider, CredentialScope, TokenAuthority, TokenFuture, STANDARD_SAFETY_MARGIN,
};
use crate::cache::Cache;
use crate::client::WechatClient;
use crate::types::{CorpId, CorpSecret};

/// WeCom access token from `GET /cgi-bin/gettoken`.
///
/// The `client` must point at the WeCom host
/// ([`WORK_BASE_URL`](crate::client::WORK_BASE_URL)). Refresh uses the same
/// double-checked lock as [`DefaultAccessToken`](super::DefaultAccessToken):
/// one fetch in flight per instance.
pub struct WorkAccessToken {
    scope: CredentialScope,
    authority: TokenAuthority,
    guard: RefreshGuard,
}

impl fmt::Debug for WorkAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkAccessToken")
            .field("scope", &self.scope)
            .field("cache_key", &self.guard.key())
            .finish_non_exhaustive()
    }
}

impl WorkAccessToken {
    pub fn new(
        corpid: CorpId,
        corpsecret: CorpSecret,
        cache_key_prefix: impl Into<String>,
        cache: Arc<dyn Cache>,
        client: WechatClient,
    ) -> Self {
        let scope = CredentialScope::enterprise(&corpid, &corpsecret, cache_key_prefix);
        let guard = RefreshGuard::new(cache, scope.cache_key(), STANDARD_SAFETY_MARGIN);
        Self {
            scope,
            authority: TokenAuthority::new(client),
            guard,
        }
    }

    pub fn corpid(&self) -> &str {
        self.scope.principal_id()
    }

    pub fn cache_key(&self) -> &str {
        self.guard.key()
    }
}

impl AccessTokenProvider for WorkAccessToken {
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
