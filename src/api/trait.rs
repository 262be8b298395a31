//! WeChat API trait and context
//!
//! Provides the base trait and context for all WeChat API implementations.

use std::sync::Arc;

use crate::client::WechatClient;
use crate::credential::AccessTokenProvider;
use crate::error::WechatError;

/// Context holding shared resources for WeChat API implementations.
///
/// API wrappers only see the token through [`AccessTokenProvider`], so they
/// work the same whichever refresh policy was configured.
#[derive(Clone)]
pub struct WechatContext {
    pub(crate) client: Arc<WechatClient>,
    pub(crate) token_provider: Arc<dyn AccessTokenProvider>,
}

impl std::fmt::Debug for WechatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatContext")
            .field("client", &self.client)
            .field("token_provider", &"AccessTokenProvider { .. }")
            .finish()
    }
}

impl WechatContext {
    pub fn new(client: Arc<WechatClient>, token_provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            client,
            token_provider,
        }
    }

    /// Get a reference to the WeChat HTTP client.
    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    /// Get a reference to the token provider.
    pub fn token_provider(&self) -> &Arc<dyn AccessTokenProvider> {
        &self.token_provider
    }

    /// Resolve a token and append it to `path`.
    pub(crate) async fn authorized_path(&self, path: &str) -> Result<String, WechatError> {
        let access_token = self.token_provider.get_access_token().await?;
        Ok(WechatClient::append_access_token(path, &access_token))
    }
}

/// Trait for WeChat API implementations.
pub trait WechatApi: Send + Sync {
    /// Get a reference to the WeChat context
    fn context(&self) -> &WechatContext;
}
