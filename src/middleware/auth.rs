//! Authentication middleware for automatic access_token injection.
//!
//! Wraps an inner service and appends the `access_token` query parameter
//! obtained from any [`AccessTokenProvider`], so caching and refresh follow
//! whichever policy the provider implements.
//!
//! A token that was fetched but could not be cached is still injected. Any
//! other provider failure is returned to the caller as a [`BoxError`] wrapping
//! the [`WechatError`], and the inner service is not called.
//!
//! # Example
//!
//! ```ignore
//! use tower::ServiceBuilder;
//! use wechat_sdk::middleware::AuthMiddleware;
//!
//! let provider: Arc<dyn AccessTokenProvider> = Arc::new(DefaultAccessToken::new(..));
//! let service = ServiceBuilder::new()
//!     .layer(AuthMiddleware::new(provider))
//!     .service(reqwest::Client::new());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Request as ReqwestRequest, Url};
use tower::{BoxError, Layer, Service};

use crate::credential::AccessTokenProvider;
use crate::error::WechatError;

/// Characters that must be encoded in query parameter values.
const QUERY_VALUE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'&')
    .add(b'=')
    .add(b'%')
    .add(b'+')
    .add(b'#');

/// Resolve a token, falling back to the one recovered from a failed cache write.
async fn resolve_token(provider: &dyn AccessTokenProvider) -> Result<String, WechatError> {
    match provider.get_access_token().await {
        Ok(token) => Ok(token),
        Err(e) => match e.recovered_token() {
            Some(token) => {
                log::warn!("Access token not cached, using fetched token: {}", e);
                Ok(token.to_string())
            }
            None => Err(e),
        },
    }
}

/// Middleware that injects access_token into requests.
#[derive(Clone)]
pub struct AuthMiddleware {
    provider: Arc<dyn AccessTokenProvider>,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }
}

impl<S> Layer<S> for AuthMiddleware {
    type Service = AuthMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddlewareService {
            inner,
            provider: Arc::clone(&self.provider),
        }
    }
}

/// Service created by AuthMiddleware that injects access_token into requests.
pub struct AuthMiddlewareService<S> {
    inner: S,
    provider: Arc<dyn AccessTokenProvider>,
}

impl<S> Clone for AuthMiddlewareService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<S, B> Service<Request<B>> for AuthMiddlewareService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let provider = Arc::clone(&self.provider);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = resolve_token(&*provider).await?;

            let uri = req.uri().clone();
            *req.uri_mut() = add_access_token_query(&uri, &token);

            inner.call(req).await.map_err(Into::into)
        })
    }
}

impl<S> Service<ReqwestRequest> for AuthMiddlewareService<S>
where
    S: Service<ReqwestRequest> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: ReqwestRequest) -> Self::Future {
        let provider = Arc::clone(&self.provider);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = resolve_token(&*provider).await?;

            let url = req.url().clone();
            *req.url_mut() = add_access_token_query_to_url(&url, &token);
            inner.call(req).await.map_err(Into::into)
        })
    }
}

/// Add access_token query parameter to a URI.
fn add_access_token_query(uri: &Uri, token: &str) -> Uri {
    let path_and_query = match uri.path_and_query() {
        Some(pq) => pq.as_str(),
        None => return uri.clone(),
    };

    let separator = if path_and_query.contains('?') {
        "&"
    } else {
        "?"
    };

    let encoded_token = utf8_percent_encode(token, QUERY_VALUE_ENCODE_SET);

    let new_path_and_query = format!(
        "{}{}access_token={}",
        path_and_query, separator, encoded_token
    );

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = match new_path_and_query.parse() {
        Ok(pq) => Some(pq),
        Err(_) => return uri.clone(),
    };

    Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
}

fn add_access_token_query_to_url(url: &Url, token: &str) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut().append_pair("access_token", token);
    url
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::cache::{Cache, CacheError, CacheFuture};
    use crate::client::WechatClient;
    use crate::credential::{
        DefaultAccessToken, StaticAccessToken, TokenFuture, CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX,
    };
    use crate::types::{AccessToken, AppId, AppSecret};

    struct ReadOnlyCache;

    impl Cache for ReadOnlyCache {
        fn get<'a>(&'a self, _key: &'a str) -> CacheFuture<'a, Option<String>> {
            Box::pin(async { Ok(None) })
        }

        fn set<'a>(&'a self, _key: &'a str, _value: &'a str, _ttl: Duration) -> CacheFuture<'a, ()> {
            Box::pin(async { Err(CacheError::Backend("read-only replica".to_string())) })
        }
    }

    struct FailingProvider {
        calls: AtomicU32,
    }

    impl AccessTokenProvider for FailingProvider {
        fn get_access_token_with_cancel<'a>(
            &'a self,
            _cancel: &'a tokio_util::sync::CancellationToken,
        ) -> TokenFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(WechatError::Token("unavailable".to_string())) })
        }
    }

    #[derive(Clone)]
    struct EchoUri;

    impl Service<Request<()>> for EchoUri {
        type Response = String;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<String, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<()>) -> Self::Future {
            std::future::ready(Ok(req.uri().to_string()))
        }
    }

    fn static_provider(token: &str) -> Arc<dyn AccessTokenProvider> {
        Arc::new(StaticAccessToken::new(AccessToken::new(token).unwrap()))
    }

    #[test]
    fn test_add_access_token_query_no_existing_query() {
        let uri: Uri = "https://api.weixin.qq.com/cgi-bin/user/info".parse().unwrap();
        let new_uri = add_access_token_query(&uri, "test_token_123");

        assert_eq!(
            new_uri.path_and_query().unwrap().as_str(),
            "/cgi-bin/user/info?access_token=test_token_123"
        );
    }

    #[test]
    fn test_add_access_token_query_with_existing_query() {
        let uri: Uri = "https://api.weixin.qq.com/cgi-bin/user/info?openid=test"
            .parse()
            .unwrap();
        let new_uri = add_access_token_query(&uri, "test_token_123");

        assert_eq!(
            new_uri.path_and_query().unwrap().as_str(),
            "/cgi-bin/user/info?openid=test&access_token=test_token_123"
        );
    }

    #[test]
    fn test_add_access_token_query_with_special_chars() {
        let uri: Uri = "https://api.weixin.qq.com/cgi-bin/user/info".parse().unwrap();
        let new_uri = add_access_token_query(&uri, "a&b=c");

        assert!(new_uri
            .path_and_query()
            .unwrap()
            .as_str()
            .ends_with("access_token=a%26b%3Dc"));
    }

    #[test]
    fn test_add_access_token_query_to_url() {
        let url = Url::parse("https://qyapi.weixin.qq.com/cgi-bin/kf/account/list").unwrap();
        let new_url = add_access_token_query_to_url(&url, "tok");
        assert_eq!(new_url.query(), Some("access_token=tok"));
    }

    #[tokio::test]
    async fn test_injects_token_from_provider() {
        let mut service = AuthMiddleware::new(static_provider("tok-A")).layer(EchoUri);
        let req = Request::get("https://api.weixin.qq.com/cgi-bin/menu/get")
            .body(())
            .unwrap();

        let uri = service.call(req).await.unwrap();
        assert_eq!(
            uri,
            "https://api.weixin.qq.com/cgi-bin/menu/get?access_token=tok-A"
        );
    }

    #[tokio::test]
    async fn test_provider_failure_reaches_caller() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicU32::new(0),
        });
        let mut service = AuthMiddleware::new(provider.clone()).layer(EchoUri);
        let req = Request::get("https://api.weixin.qq.com/cgi-bin/menu/get")
            .body(())
            .unwrap();

        let err = service.call(req).await.unwrap_err();
        let err = err.downcast::<WechatError>().unwrap();
        assert!(matches!(*err, WechatError::Token(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_injects_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-A",
                "expires_in": 7200
            })))
            .mount(&mock_server)
            .await;

        let provider = Arc::new(DefaultAccessToken::new(
            AppId::new("wx1234567890abcdef").unwrap(),
            AppSecret::new("secret1234567890ab").unwrap(),
            CACHE_KEY_OFFICIAL_ACCOUNT_PREFIX,
            Arc::new(ReadOnlyCache),
            WechatClient::builder()
                .base_url(mock_server.uri())
                .build()
                .unwrap(),
        ));
        let mut service = AuthMiddleware::new(provider).layer(EchoUri);
        let req = Request::get("https://api.weixin.qq.com/cgi-bin/menu/get")
            .body(())
            .unwrap();

        let uri = service.call(req).await.unwrap();
        assert_eq!(
            uri,
            "https://api.weixin.qq.com/cgi-bin/menu/get?access_token=tok-A"
        );
    }
}
