//! WeCom customer service (KF) accounts
//!
//! # Endpoints
//!
//! - [`KfAccountApi::account_add`] - Create a KF account
//! - [`KfAccountApi::account_del`] - Delete a KF account
//! - [`KfAccountApi::account_update`] - Rename or change the avatar
//! - [`KfAccountApi::account_list`] - List KF accounts
//! - [`KfAccountApi::add_contact_way`] - Get a contact link for an account

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::common::{ApiResponseBase, WechatApiResponse};
use super::{WechatApi, WechatContext};
use crate::error::WechatError;

const ACCOUNT_ADD_PATH: &str = "/cgi-bin/kf/account/add";
const ACCOUNT_DEL_PATH: &str = "/cgi-bin/kf/account/del";
const ACCOUNT_UPDATE_PATH: &str = "/cgi-bin/kf/account/update";
const ACCOUNT_LIST_PATH: &str = "/cgi-bin/kf/account/list";
const ADD_CONTACT_WAY_PATH: &str = "/cgi-bin/kf/add_contact_way";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AccountAddOptions {
    /// At most 16 characters
    pub name: String,
    /// Temporary media ID of the avatar
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct AccountDelRequest<'a> {
    open_kfid: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountUpdateOptions {
    pub open_kfid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddContactWayOptions {
    pub open_kfid: String,
    /// Developer-defined scene, `[0-9a-zA-Z_-]*`, at most 32 bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountAddResponse {
    pub open_kfid: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub open_kfid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountListResponse {
    #[serde(default)]
    pub account_list: Vec<AccountInfo>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddContactWayResponse {
    pub url: String,
}

// ============================================================================
// KfAccountApi
// ============================================================================

/// WeCom customer service account API
pub struct KfAccountApi {
    context: Arc<WechatContext>,
}

impl KfAccountApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// POST /cgi-bin/kf/account/add?access_token=ACCESS_TOKEN
    pub async fn account_add(
        &self,
        options: &AccountAddOptions,
    ) -> Result<AccountAddResponse, WechatError> {
        let path = self.context.authorized_path(ACCOUNT_ADD_PATH).await?;
        self.context.client.post(&path, options).await
    }

    /// POST /cgi-bin/kf/account/del?access_token=ACCESS_TOKEN
    pub async fn account_del(&self, open_kfid: &str) -> Result<(), WechatError> {
        let path = self.context.authorized_path(ACCOUNT_DEL_PATH).await?;
        let body = AccountDelRequest { open_kfid };
        let response: ApiResponseBase = self.context.client.post(&path, &body).await?;
        response.check()
    }

    /// POST /cgi-bin/kf/account/update?access_token=ACCESS_TOKEN
    pub async fn account_update(&self, options: &AccountUpdateOptions) -> Result<(), WechatError> {
        let path = self.context.authorized_path(ACCOUNT_UPDATE_PATH).await?;
        let response: ApiResponseBase = self.context.client.post(&path, options).await?;
        response.check()
    }

    /// GET /cgi-bin/kf/account/list?access_token=ACCESS_TOKEN
    pub async fn account_list(&self) -> Result<AccountListResponse, WechatError> {
        let path = self.context.authorized_path(ACCOUNT_LIST_PATH).await?;
        self.context.client.get(&path, &[]).await
    }

    /// POST /cgi-bin/kf/add_contact_way?access_token=ACCESS_TOKEN
    pub async fn add_contact_way(
        &self,
        options: &AddContactWayOptions,
    ) -> Result<AddContactWayResponse, WechatError> {
        let path = self.context.authorized_path(ADD_CONTACT_WAY_PATH).await?;
        self.context.client.post(&path, options).await
    }
}

impl WechatApi for KfAccountApi {
    fn context(&self) -> &WechatContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_options_skip_unset_fields() {
        let options = AccountUpdateOptions {
            open_kfid: "wkAJ2GCAAASSm4_FhToWMFea0xAFfd3Q".to_string(),
            name: Some("Support".to_string()),
            media_id: None,
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({
                "open_kfid": "wkAJ2GCAAASSm4_FhToWMFea0xAFfd3Q",
                "name": "Support"
            })
        );
    }

    #[test]
    fn test_account_list_parse() {
        let json = r#"{
            "errcode": 0,
            "errmsg": "ok",
            "account_list": [
                {"open_kfid": "wkAJ2GCAAASSm4_FhToWMFea0xAFfd3Q", "name": "Support", "avatar": "https://wework.qpic.cn/a"}
            ]
        }"#;
        let response: AccountListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.account_list.len(), 1);
        assert_eq!(response.account_list[0].name, "Support");
    }
}
