//! Official account (and mini program) client

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::qrcode::{QrCodeApi, QrCodeRequest, QrCodeTicket};
use crate::api::WechatContext;
use crate::credential::{AccessTokenProvider, DefaultJsTicket, JsTicketProvider};
use crate::error::WechatError;
use crate::types::AppId;

use super::builder::OfficialAccountBuilder;

/// Official account client
///
/// Every API call resolves its token through the configured
/// [`AccessTokenProvider`], so clones share one cache entry and one
/// refresh lock.
///
/// # Example
///
/// ```rust,ignore
/// use wechat_sdk::client::OfficialAccount;
/// use wechat_sdk::types::{AppId, AppSecret};
///
/// let account = OfficialAccount::builder()
///     .appid(AppId::new("wx1234567890abcdef")?)
///     .secret(AppSecret::new("your_secret")?)
///     .build()?;
///
/// let token = account.get_access_token().await?;
/// ```
#[derive(Clone)]
pub struct OfficialAccount {
    context: Arc<WechatContext>,
    appid: AppId,
    js_ticket: Arc<DefaultJsTicket>,
}

impl std::fmt::Debug for OfficialAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialAccount")
            .field("appid", &self.appid)
            .field("js_ticket", &self.js_ticket)
            .finish_non_exhaustive()
    }
}

impl OfficialAccount {
    pub fn builder() -> OfficialAccountBuilder {
        OfficialAccountBuilder::default()
    }

    pub(crate) fn new(
        context: Arc<WechatContext>,
        appid: AppId,
        js_ticket: Arc<DefaultJsTicket>,
    ) -> Self {
        Self {
            context,
            appid,
            js_ticket,
        }
    }

    pub fn appid(&self) -> &str {
        self.appid.as_str()
    }

    pub fn context(&self) -> &Arc<WechatContext> {
        &self.context
    }

    pub fn token_provider(&self) -> &Arc<dyn AccessTokenProvider> {
        self.context.token_provider()
    }

    pub async fn get_access_token(&self) -> Result<String, WechatError> {
        self.context.token_provider.get_access_token().await
    }

    pub async fn get_access_token_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, WechatError> {
        self.context
            .token_provider
            .get_access_token_with_cancel(cancel)
            .await
    }

    /// Cached JS-SDK `jsapi` ticket
    pub async fn get_js_ticket(&self) -> Result<String, WechatError> {
        let cancel = CancellationToken::new();
        let access_token = self
            .context
            .token_provider
            .get_access_token_with_cancel(&cancel)
            .await?;
        self.js_ticket.get_ticket(&access_token, &cancel).await
    }

    // QR Code API

    pub fn qrcode(&self) -> QrCodeApi {
        QrCodeApi::new(self.context.clone())
    }

    pub async fn get_qr_ticket(&self, request: &QrCodeRequest) -> Result<QrCodeTicket, WechatError> {
        self.qrcode().get_qr_ticket(request).await
    }
}
