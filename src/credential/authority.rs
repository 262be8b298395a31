use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::guard::Issued;
use super::{with_cancel, CredentialScope, IssuerKind};
use crate::client::WechatClient;
use crate::error::WechatError;

const TOKEN_PATH: &str = "/cgi-bin/token";
const STABLE_TOKEN_PATH: &str = "/cgi-bin/stable_token";
const WORK_TOKEN_PATH: &str = "/cgi-bin/gettoken";
const GRANT_TYPE: &str = "client_credential";

/// Token envelope returned by the issuing endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub errcode: i32,
    #[serde(default)]
    pub errmsg: String,
}

impl TokenResponse {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }

    pub(crate) fn into_issued(self) -> Issued {
        Issued {
            value: self.access_token,
            expires_in: self.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
struct StableTokenRequest<'a> {
    grant_type: &'a str,
    appid: &'a str,
    secret: &'a str,
    force_refresh: bool,
}

/// Client for the remote token issuer.
///
/// Each call is exactly one round trip; nothing is cached or retried here.
/// Use it directly to force a token from the server.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    client: WechatClient,
}

impl TokenAuthority {
    pub fn new(client: WechatClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    /// Fetch a token for `scope` from the endpoint matching its issuer kind.
    ///
    /// Stable scopes are fetched without `force_refresh`.
    ///
    /// # Errors
    /// - `WechatError::Api` when the issuer answers with a non-zero `errcode`
    /// - `WechatError::Http` on transport or decode failure
    /// - `WechatError::Cancelled` when `cancel` fires before the response arrives
    pub async fn fetch_token(
        &self,
        scope: &CredentialScope,
        cancel: &CancellationToken,
    ) -> Result<TokenResponse, WechatError> {
        match scope.kind() {
            IssuerKind::StandardApp => {
                let query = [
                    ("grant_type", GRANT_TYPE),
                    ("appid", scope.principal_id()),
                    ("secret", scope.secret()),
                ];
                let response = with_cancel(cancel, self.client.get(TOKEN_PATH, &query)).await?;
                validate(response)
            }
            IssuerKind::EnterpriseApp => {
                let query = [
                    ("corpid", scope.principal_id()),
                    ("corpsecret", scope.secret()),
                ];
                let response =
                    with_cancel(cancel, self.client.get(WORK_TOKEN_PATH, &query)).await?;
                validate(response)
            }
            IssuerKind::StableApp => self.fetch_stable_token(scope, false, cancel).await,
        }
    }

    /// POST to the stable token endpoint.
    ///
    /// With `force_refresh` the issuer mints a new token even if its own
    /// copy is still valid, invalidating the previous one.
    pub async fn fetch_stable_token(
        &self,
        scope: &CredentialScope,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<TokenResponse, WechatError> {
        let body = StableTokenRequest {
            grant_type: GRANT_TYPE,
            appid: scope.principal_id(),
            secret: scope.secret(),
            force_refresh,
        };
        let response = with_cancel(cancel, self.client.post(STABLE_TOKEN_PATH, &body)).await?;
        validate(response)
    }
}

fn validate(response: TokenResponse) -> Result<TokenResponse, WechatError> {
    WechatError::check_api(response.errcode, &response.errmsg)?;
    if response.access_token.is_empty() {
        return Err(WechatError::Token(
            "issuer returned an empty access_token".to_string(),
        ));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_defaults() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"tok","expires_in":7200}"#).unwrap();
        assert!(response.is_success());
        assert_eq!(response.expires_in, 7200);
        assert!(response.errmsg.is_empty());
    }

    #[test]
    fn test_validate_denied() {
        let response = TokenResponse {
            access_token: String::new(),
            expires_in: 0,
            errcode: 40013,
            errmsg: "invalid appid".to_string(),
        };
        let err = validate(response).unwrap_err();
        assert_eq!(err.api_code(), Some(40013));
    }

    #[test]
    fn test_validate_empty_token() {
        let response = TokenResponse {
            access_token: String::new(),
            expires_in: 7200,
            errcode: 0,
            errmsg: String::new(),
        };
        assert!(matches!(validate(response), Err(WechatError::Token(_))));
    }

    #[test]
    fn test_stable_request_body() {
        let body = StableTokenRequest {
            grant_type: GRANT_TYPE,
            appid: "wx1234567890abcdef",
            secret: "s",
            force_refresh: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "grant_type": "client_credential",
                "appid": "wx1234567890abcdef",
                "secret": "s",
                "force_refresh": true
            })
        );
    }
}
