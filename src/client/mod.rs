//! WeChat HTTP client and per-product facades
//!
//! - [`WechatClient`] - Credential-free HTTP transport
//! - [`OfficialAccount`] - Official account / mini program facade
//! - [`Work`] - WeCom facade

mod wechat_client;
pub use wechat_client::{decode_envelope, WechatClient, WechatClientBuilder, DEFAULT_BASE_URL, WORK_BASE_URL};

mod official_account;
pub use official_account::OfficialAccount;

mod work;
pub use work::Work;

mod builder;
pub use builder::{OfficialAccountBuilder, TokenPolicy, WorkBuilder};
