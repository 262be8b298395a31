//! Access token usage for wechat-sdk
//!
//! Run with: cargo run --example token_usage

use std::sync::Arc;
use std::time::Duration;

use wechat_sdk::{
    api::{show_qrcode_url, QrCodeRequest},
    cache::MemoryCache,
    types::{AppId, AppSecret, CorpId, CorpSecret},
    OfficialAccount, TokenPolicy, Work,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // One cache can back several accounts; keys carry the prefix and principal
    let cache = Arc::new(MemoryCache::new());

    let account = OfficialAccount::builder()
        .appid(AppId::new("wx1234567890abcdef")?)
        .secret(AppSecret::new("your_app_secret_here")?)
        .cache(cache.clone())
        .token_policy(TokenPolicy::Stable)
        .build()?;

    match account.get_access_token().await {
        Ok(_) => println!("Access token cached for {}", account.appid()),
        Err(error) if error.recovered_token().is_some() => {
            eprintln!("Token fetched but not cached: {error}")
        }
        Err(error) => eprintln!("get_access_token failed: {error}"),
    }

    let request = QrCodeRequest::temporary(Duration::from_secs(3600), "invite");
    match account.get_qr_ticket(&request).await {
        Ok(ticket) => println!("QR code image: {}", show_qrcode_url(&ticket)),
        Err(error) => eprintln!("get_qr_ticket failed: {error}"),
    }

    let work = Work::builder()
        .corpid(CorpId::new("ww0123456789abcdef")?)
        .corpsecret(CorpSecret::new("your_corp_secret_here")?)
        .cache(cache)
        .build()?;

    match work.kf_account_list().await {
        Ok(response) => println!("KF accounts: {}", response.account_list.len()),
        Err(error) => eprintln!("kf_account_list failed: {error}"),
    }

    Ok(())
}
