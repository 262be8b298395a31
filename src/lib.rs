//! WeChat server-side SDK for Rust
//!
//! Access token acquisition and caching for WeChat official accounts,
//! mini programs and WeCom, plus the API wrappers built on top of it.
//!
//! ## Token Policies
//!
//! | Provider | Endpoint | Cached for |
//! |----------|----------|------------|
//! | [`DefaultAccessToken`](credential::DefaultAccessToken) | `GET /cgi-bin/token` | `expires_in - 1500s` |
//! | [`StableAccessToken`](credential::StableAccessToken) | `POST /cgi-bin/stable_token` | `expires_in - 300s` |
//! | [`WorkAccessToken`](credential::WorkAccessToken) | `GET /cgi-bin/gettoken` | `expires_in - 1500s` |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wechat_sdk::{OfficialAccount, types::{AppId, AppSecret}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let account = OfficialAccount::builder()
//!         .appid(AppId::new("wx1234567890abcdef")?)
//!         .secret(AppSecret::new("your_secret")?)
//!         .build()?;
//!
//!     // Fetched once, then served from cache until 1500s before expiry
//!     let token = account.get_access_token().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - API wrappers (QR codes, WeCom KF accounts)
//! - [`cache`] - Cache abstraction and in-memory backend
//! - [`client`] - HTTP client and product facades
//! - [`credential`] - Access token providers
//! - [`error`] - Error types
//! - [`middleware`] - Tower layers for token injection and logging
//! - [`types`] - Validated identifiers
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use wechat_sdk::WechatError;
//!
//! match account.get_access_token().await {
//!     Ok(token) => { /* use token */ }
//!     Err(WechatError::Api { code, message }) => {
//!         eprintln!("API error: {} - {}", code, message);
//!     }
//!     Err(e @ WechatError::CacheWrite { .. }) => {
//!         // The token is valid, only caching it failed
//!         let token = e.recovered_token();
//!     }
//!     Err(e) => {
//!         eprintln!("Other error: {}", e);
//!     }
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod credential;
pub mod error;
pub mod middleware;
pub mod types;

pub use client::{
    OfficialAccount, OfficialAccountBuilder, TokenPolicy, WechatClient, WechatClientBuilder, Work,
    WorkBuilder,
};
pub use error::WechatError;
