use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::api::WechatContext;
use crate::cache::{Cache, MemoryCache};
use crate::credential::{
    AccessTokenProvider, DefaultAccessToken, DefaultJsTicket, StableAccessToken, WorkAccessToken,
    CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX, CACHE_KEY_WORK_PREFIX,
};
use crate::error::WechatError;
use crate::types::{AppId, AppSecret, CorpId, CorpSecret};

use super::wechat_client::{MiddlewareExecutor, WechatClient, DEFAULT_BASE_URL, WORK_BASE_URL};
use super::{OfficialAccount, Work};

/// Refresh policy used when no custom provider is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// [`DefaultAccessToken`]: `/cgi-bin/token` behind a local lock
    #[default]
    Default,
    /// [`StableAccessToken`]: `/cgi-bin/stable_token`, no local lock
    Stable,
}

#[derive(Debug, Default)]
struct HttpOptions {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl HttpOptions {
    fn build_client<M>(self, default_base_url: &str, middleware: Option<M>) -> Result<WechatClient, WechatError>
    where
        M: Layer<WechatClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let mut builder = WechatClient::builder()
            .base_url(self.base_url.unwrap_or_else(|| default_base_url.to_string()));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let mut client = builder.build()?;

        if let Some(middleware) = middleware {
            let service = middleware.layer(client.clone());
            client = client.with_middleware_executor(make_middleware_executor(service));
        }

        Ok(client)
    }
}

fn make_middleware_executor<S>(service: S) -> MiddlewareExecutor
where
    S: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: ReqwestRequest| {
        let mut service = (*service).clone();
        Box::pin(async move { service.call(request).await })
            as Pin<Box<dyn Future<Output = Result<ReqwestResponse, reqwest::Error>> + Send>>
    })
}

// ============================================================================
// OfficialAccountBuilder
// ============================================================================

/// Builder for [`OfficialAccount`]
///
/// Also used for mini programs with
/// [`CACHE_KEY_MINI_PROGRAM_PREFIX`](crate::credential::CACHE_KEY_MINI_PROGRAM_PREFIX).
#[must_use]
pub struct OfficialAccountBuilder<M = ()> {
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    cache_key_prefix: String,
    cache: Option<Arc<dyn Cache>>,
    token_policy: TokenPolicy,
    token_provider: Option<Arc<dyn AccessTokenProvider>>,
    http: HttpOptions,
    middleware: Option<M>,
}

impl Default for OfficialAccountBuilder {
    fn default() -> Self {
        Self {
            appid: None,
            secret: None,
            cache_key_prefix: CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX.to_string(),
            cache: None,
            token_policy: TokenPolicy::Default,
            token_provider: None,
            http: HttpOptions::default(),
            middleware: None,
        }
    }
}

impl<M> std::fmt::Debug for OfficialAccountBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialAccountBuilder")
            .field("appid", &self.appid)
            .field("cache_key_prefix", &self.cache_key_prefix)
            .field("token_policy", &self.token_policy)
            .field("http", &self.http)
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> OfficialAccountBuilder<M> {
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Default: [`CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX`]
    pub fn cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    /// Shared token cache. Default: a private [`MemoryCache`]
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Use a custom provider instead of the built-in policies.
    ///
    /// The secret is not required when a provider is supplied.
    pub fn token_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http.connect_timeout = Some(timeout);
        self
    }

    pub fn with_middleware<M2>(self, middleware: M2) -> OfficialAccountBuilder<M2>
    where
        M2: Layer<WechatClient> + Clone + Send + Sync + 'static,
    {
        OfficialAccountBuilder {
            appid: self.appid,
            secret: self.secret,
            cache_key_prefix: self.cache_key_prefix,
            cache: self.cache,
            token_policy: self.token_policy,
            token_provider: self.token_provider,
            http: self.http,
            middleware: Some(middleware),
        }
    }

    pub fn build(self) -> Result<OfficialAccount, WechatError>
    where
        M: Layer<WechatClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;

        let client = self.http.build_client(DEFAULT_BASE_URL, self.middleware)?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn Cache>);

        let token_provider: Arc<dyn AccessTokenProvider> = match self.token_provider {
            Some(provider) => provider,
            None => {
                let secret = self
                    .secret
                    .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;
                match self.token_policy {
                    TokenPolicy::Default => Arc::new(DefaultAccessToken::new(
                        appid.clone(),
                        secret,
                        self.cache_key_prefix.clone(),
                        Arc::clone(&cache),
                        client.clone(),
                    )),
                    TokenPolicy::Stable => Arc::new(StableAccessToken::new(
                        appid.clone(),
                        secret,
                        self.cache_key_prefix.clone(),
                        Arc::clone(&cache),
                        client.clone(),
                    )),
                }
            }
        };

        let js_ticket = Arc::new(DefaultJsTicket::new(
            &appid,
            &self.cache_key_prefix,
            cache,
            client.clone(),
        ));
        let context = Arc::new(WechatContext::new(Arc::new(client), token_provider));

        Ok(OfficialAccount::new(context, appid, js_ticket))
    }
}

// ============================================================================
// WorkBuilder
// ============================================================================

/// Builder for [`Work`]
#[must_use]
pub struct WorkBuilder<M = ()> {
    corpid: Option<CorpId>,
    corpsecret: Option<CorpSecret>,
    cache_key_prefix: String,
    cache: Option<Arc<dyn Cache>>,
    token_provider: Option<Arc<dyn AccessTokenProvider>>,
    http: HttpOptions,
    middleware: Option<M>,
}

impl Default for WorkBuilder {
    fn default() -> Self {
        Self {
            corpid: None,
            corpsecret: None,
            cache_key_prefix: CACHE_KEY_WORK_PREFIX.to_string(),
            cache: None,
            token_provider: None,
            http: HttpOptions::default(),
            middleware: None,
        }
    }
}

impl<M> std::fmt::Debug for WorkBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkBuilder")
            .field("corpid", &self.corpid)
            .field("cache_key_prefix", &self.cache_key_prefix)
            .field("http", &self.http)
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> WorkBuilder<M> {
    pub fn corpid(mut self, corpid: CorpId) -> Self {
        self.corpid = Some(corpid);
        self
    }

    pub fn corpsecret(mut self, corpsecret: CorpSecret) -> Self {
        self.corpsecret = Some(corpsecret);
        self
    }

    /// Default: [`CACHE_KEY_WORK_PREFIX`]
    pub fn cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Default: `<https://qyapi.weixin.qq.com>`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http.connect_timeout = Some(timeout);
        self
    }

    pub fn with_middleware<M2>(self, middleware: M2) -> WorkBuilder<M2>
    where
        M2: Layer<WechatClient> + Clone + Send + Sync + 'static,
    {
        WorkBuilder {
            corpid: self.corpid,
            corpsecret: self.corpsecret,
            cache_key_prefix: self.cache_key_prefix,
            cache: self.cache,
            token_provider: self.token_provider,
            http: self.http,
            middleware: Some(middleware),
        }
    }

    pub fn build(self) -> Result<Work, WechatError>
    where
        M: Layer<WechatClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let corpid = self
            .corpid
            .ok_or_else(|| WechatError::Config("corpid is required".to_string()))?;

        let client = self.http.build_client(WORK_BASE_URL, self.middleware)?;

        let token_provider: Arc<dyn AccessTokenProvider> = match self.token_provider {
            Some(provider) => provider,
            None => {
                let corpsecret = self
                    .corpsecret
                    .ok_or_else(|| WechatError::Config("corpsecret is required".to_string()))?;
                let cache = self
                    .cache
                    .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn Cache>);
                Arc::new(WorkAccessToken::new(
                    corpid.clone(),
                    corpsecret,
                    self.cache_key_prefix,
                    cache,
                    client.clone(),
                ))
            }
        };

        let context = Arc::new(WechatContext::new(Arc::new(client), token_provider));
        Ok(Work::new(context, corpid))
    }
}
