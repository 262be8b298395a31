//! WeCom client

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::kf::{
    AccountAddOptions, AccountAddResponse, AccountListResponse, AccountUpdateOptions,
    AddContactWayOptions, AddContactWayResponse, KfAccountApi,
};
use crate::api::WechatContext;
use crate::credential::AccessTokenProvider;
use crate::error::WechatError;
use crate::types::CorpId;

use super::builder::WorkBuilder;

/// WeCom client bound to one `corpid` / `corpsecret` pair
#[derive(Clone)]
pub struct Work {
    context: Arc<WechatContext>,
    corpid: CorpId,
}

impl std::fmt::Debug for Work {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Work")
            .field("corpid", &self.corpid)
            .finish_non_exhaustive()
    }
}

impl Work {
    pub fn builder() -> WorkBuilder {
        WorkBuilder::default()
    }

    pub(crate) fn new(context: Arc<WechatContext>, corpid: CorpId) -> Self {
        Self { context, corpid }
    }

    pub fn corpid(&self) -> &str {
        self.corpid.as_str()
    }

    pub fn context(&self) -> &Arc<WechatContext> {
        &self.context
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

    // KF API

    pub fn kf(&self) -> KfAccountApi {
        KfAccountApi::new(self.context.clone())
    }

    pub async fn kf_account_add(
        &self,
        options: &AccountAddOptions,
    ) -> Result<AccountAddResponse, WechatError> {
        self.kf().account_add(options).await
    }

    pub async fn kf_account_del(&self, open_kfid: &str) -> Result<(), WechatError> {
        self.kf().account_del(open_kfid).await
    }

    pub async fn kf_account_update(&self, options: &AccountUpdateOptions) -> Result<(), WechatError> {
        self.kf().account_update(options).await
    }

    pub async fn kf_account_list(&self) -> Result<AccountListResponse, WechatError> {
        self.kf().account_list().await
    }

    pub async fn kf_add_contact_way(
        &self,
        options: &AddContactWayOptions,
    ) -> Result<AddContactWayResponse, WechatError> {
        self.kf().add_contact_way(options).await
    }
}
