//! WeChat API modules
//!
//! Thin wrappers that resolve an access token through the configured
//! [`AccessTokenProvider`](crate::credential::AccessTokenProvider) and call
//! one endpoint:
//!
//! - [`common`] - Shared `errcode` / `errmsg` response primitives
//! - [`qrcode`] - Official account parametric QR codes
//! - [`kf`] - WeCom customer service accounts

pub mod common;
pub mod kf;
pub mod qrcode;
pub mod r#trait;

pub use common::{ApiResponseBase, WechatApiResponse};
pub use kf::{
    AccountAddOptions, AccountAddResponse, AccountInfo, AccountListResponse,
    AccountUpdateOptions, AddContactWayOptions, AddContactWayResponse, KfAccountApi,
};
pub use qrcode::{show_qrcode_url, QrActionName, QrCodeApi, QrCodeRequest, QrCodeTicket, Scene};
pub use r#trait::{WechatApi, WechatContext};
