use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::guard::{Issued, RefreshGuard};
use super::{with_cancel, TokenFuture, STANDARD_SAFETY_MARGIN};
use crate::cache::Cache;
use crate::client::WechatClient;
use crate::error::WechatError;
use crate::types::AppId;

const TICKET_PATH: &str = "/cgi-bin/ticket/getticket";

/// Ticket flavour requested from `/cgi-bin/ticket/getticket`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketType {
    /// JS-SDK signature ticket
    Jsapi,
    /// Card coupon ticket
    WxCard,
}

impl TicketType {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketType::Jsapi => "jsapi",
            TicketType::WxCard => "wx_card",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(default)]
    ticket: String,
    #[serde(default)]
    expires_in: u64,
}

/// Source of a JS-SDK ticket for a given access token.
pub trait JsTicketProvider: Send + Sync {
    fn get_ticket<'a>(
        &'a self,
        access_token: &'a str,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a>;
}

/// Cached ticket with the same refresh discipline as the default access token.
///
/// Cache key: `{prefix}_{type}_ticket_{appid}`.
pub struct DefaultJsTicket {
    client: WechatClient,
    ticket_type: TicketType,
    guard: RefreshGuard,
}

impl fmt::Debug for DefaultJsTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultJsTicket")
            .field("ticket_type", &self.ticket_type)
            .field("cache_key", &self.guard.key())
            .finish_non_exhaustive()
    }
}

impl DefaultJsTicket {
    pub fn new(
        appid: &AppId,
        cache_key_prefix: &str,
        cache: Arc<dyn Cache>,
        client: WechatClient,
    ) -> Self {
        Self::with_type(appid, cache_key_prefix, TicketType::Jsapi, cache, client)
    }

    pub fn with_type(
        appid: &AppId,
        cache_key_prefix: &str,
        ticket_type: TicketType,
        cache: Arc<dyn Cache>,
        client: WechatClient,
    ) -> Self {
        let key = format!(
            "{}_{}_ticket_{}",
            cache_key_prefix,
            ticket_type.as_str(),
            appid.as_str()
        );
        Self {
            client,
            ticket_type,
            guard: RefreshGuard::new(cache, key, STANDARD_SAFETY_MARGIN),
        }
    }

    pub fn cache_key(&self) -> &str {
        self.guard.key()
    }

    async fn fetch(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<Issued, WechatError> {
        let query = [
            ("access_token", access_token),
            ("type", self.ticket_type.as_str()),
        ];
        let response: TicketResponse =
            with_cancel(cancel, self.client.get(TICKET_PATH, &query)).await?;
        if response.ticket.is_empty() {
            return Err(WechatError::Token(
                "issuer returned an empty ticket".to_string(),
            ));
        }
        Ok(Issued {
            value: response.ticket,
            expires_in: response.expires_in,
        })
    }
}

impl JsTicketProvider for DefaultJsTicket {
    fn get_ticket<'a>(
        &'a self,
        access_token: &'a str,
        cancel: &'a CancellationToken,
    ) -> TokenFuture<'a> {
        Box::pin(
            self.guard
                .get_or_refresh(cancel, move || self.fetch(access_token, cancel)),
        )
    }
}
