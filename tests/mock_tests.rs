use std::sync::Arc;
use std::time::Duration;

use wechat_sdk::api::{
    AccountAddOptions, AccountUpdateOptions, AddContactWayOptions, QrCodeRequest,
};
use wechat_sdk::cache::{Cache, MemoryCache};
use wechat_sdk::credential::{StaticAccessToken, CACHE_KEY_MINI_PROGRAM_PREFIX};
use wechat_sdk::types::{AccessToken, AppId, AppSecret, CorpId, CorpSecret};
use wechat_sdk::{OfficialAccount, TokenPolicy, WechatError, Work};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPID: &str = "wx1234567890abcdef";

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "expires_in": 7200
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_work_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/gettoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "access_token": token,
            "expires_in": 7200
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn official_account(base_url: &str) -> OfficialAccount {
    OfficialAccount::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new("secret1234567890ab").unwrap())
        .base_url(base_url)
        .build()
        .unwrap()
}

fn work(base_url: &str) -> Work {
    Work::builder()
        .corpid(CorpId::new("ww0123456789").unwrap())
        .corpsecret(CorpSecret::new("corpsecret").unwrap())
        .base_url(base_url)
        .build()
        .unwrap()
}

// ============================================================================
// OfficialAccount
// ============================================================================

#[tokio::test]
async fn test_qr_ticket_uses_cached_token() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "tok-A").await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/qrcode/create"))
        .and(query_param("access_token", "tok-A"))
        .and(body_json(serde_json::json!({
            "expire_seconds": 604800,
            "action_name": "QR_STR_SCENE",
            "action_info": {"scene": {"scene_str": "invite"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ticket": "gQH47joAAAAAAAAAASxod",
            "expire_seconds": 604800,
            "url": "http://weixin.qq.com/q/kZgfwMTm72WWPkovabbI"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let account = official_account(&mock_server.uri());
    let request = QrCodeRequest::temporary(Duration::from_secs(604800), "invite");

    let ticket = account.get_qr_ticket(&request).await.unwrap();
    assert_eq!(ticket.ticket, "gQH47joAAAAAAAAAASxod");
    assert_eq!(ticket.expire_seconds, 604800);

    // Second call reuses the cached token; mount_token expects one fetch
    let again = account.qrcode().get_qr_ticket(&request).await.unwrap();
    assert_eq!(again.url, "http://weixin.qq.com/q/kZgfwMTm72WWPkovabbI");
}

#[tokio::test]
async fn test_qr_ticket_api_error() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "tok-A").await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/qrcode/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40013,
            "errmsg": "invalid appid"
        })))
        .mount(&mock_server)
        .await;

    let account = official_account(&mock_server.uri());
    let err = account
        .get_qr_ticket(&QrCodeRequest::permanent(1u32))
        .await
        .unwrap_err();
    assert_eq!(err.api_code(), Some(40013));
}

#[tokio::test]
async fn test_token_failure_stops_api_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40125,
            "errmsg": "invalid appsecret"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/qrcode/create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let account = official_account(&mock_server.uri());
    let err = account
        .get_qr_ticket(&QrCodeRequest::permanent("shop"))
        .await
        .unwrap_err();
    assert!(matches!(err, WechatError::Api { code: 40125, .. }));
}

#[tokio::test]
async fn test_stable_policy_with_shared_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "stable-A",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let account = OfficialAccount::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new("secret1234567890ab").unwrap())
        .base_url(mock_server.uri())
        .cache(cache.clone())
        .cache_key_prefix(CACHE_KEY_MINI_PROGRAM_PREFIX)
        .token_policy(TokenPolicy::Stable)
        .build()
        .unwrap();

    assert_eq!(account.get_access_token().await.unwrap(), "stable-A");
    assert_eq!(account.get_access_token().await.unwrap(), "stable-A");
    assert_eq!(
        cache
            .get("wechat_miniprogram_stable_access_token_wx1234567890abcdef")
            .await
            .unwrap()
            .as_deref(),
        Some("stable-A")
    );
}

#[tokio::test]
async fn test_js_ticket_through_facade() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, "tok-A").await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("access_token", "tok-A"))
        .and(query_param("type", "jsapi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "ticket": "sM4AOVdWfPE4DxkXGEs8VMCPGGVi4C3VM0P37wVUCFvkVAy_90u5h9nbSlYy3-Sl",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let account = official_account(&mock_server.uri());
    let ticket = account.get_js_ticket().await.unwrap();
    assert!(ticket.starts_with("sM4AOVdWfPE4"));
    assert_eq!(account.get_js_ticket().await.unwrap(), ticket);
}

#[tokio::test]
async fn test_custom_provider_bypasses_issuer() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/qrcode/create"))
        .and(query_param("access_token", "authorizer-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ticket": "t",
            "url": "u"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let account = OfficialAccount::builder()
        .appid(AppId::new(APPID).unwrap())
        .base_url(mock_server.uri())
        .token_provider(Arc::new(StaticAccessToken::new(
            AccessToken::new("authorizer-token").unwrap(),
        )))
        .build()
        .unwrap();

    let ticket = account
        .get_qr_ticket(&QrCodeRequest::permanent(9u32))
        .await
        .unwrap();
    assert_eq!(ticket.expire_seconds, 0);
}

// ============================================================================
// Work KF
// ============================================================================

#[tokio::test]
async fn test_kf_account_add() {
    let mock_server = MockServer::start().await;
    mount_work_token(&mock_server, "work-A").await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/kf/account/add"))
        .and(query_param("access_token", "work-A"))
        .and(body_json(serde_json::json!({
            "name": "Support",
            "media_id": "294DpAog3YA5b9rTK4PjjfRfYLO0L5qpDHAJIzhhQ2jAEWjb9i661Q4lk8oFnPtmj"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "open_kfid": "wkAJ2GCAAASSm4_FhToWMFea0xAFfd3Q"
        })))
        .mount(&mock_server)
        .await;

    let work = work(&mock_server.uri());
    let response = work
        .kf_account_add(&AccountAddOptions {
            name: "Support".to_string(),
            media_id: "294DpAog3YA5b9rTK4PjjfRfYLO0L5qpDHAJIzhhQ2jAEWjb9i661Q4lk8oFnPtmj"
                .to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.open_kfid, "wkAJ2GCAAASSm4_FhToWMFea0xAFfd3Q");
}

#[tokio::test]
async fn test_kf_account_del_and_update() {
    let mock_server = MockServer::start().await;
    mount_work_token(&mock_server, "work-A").await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/kf/account/del"))
        .and(body_json(serde_json::json!({"open_kfid": "wk1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/kf/account/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 95000,
            "errmsg": "invalid open_kfid"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let work = work(&mock_server.uri());
    work.kf_account_del("wk1").await.unwrap();

    let err = work
        .kf_account_update(&AccountUpdateOptions {
            open_kfid: "wk-missing".to_string(),
            name: Some("Renamed".to_string()),
            media_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.api_code(), Some(95000));
}

#[tokio::test]
async fn test_kf_account_list_and_contact_way() {
    let mock_server = MockServer::start().await;
    mount_work_token(&mock_server, "work-A").await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/kf/account/list"))
        .and(query_param("access_token", "work-A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "account_list": [
                {"open_kfid": "wk1", "name": "Support", "avatar": "https://wework.qpic.cn/a"},
                {"open_kfid": "wk2", "name": "Sales", "avatar": "https://wework.qpic.cn/b"}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/kf/add_contact_way"))
        .and(body_json(serde_json::json!({"open_kfid": "wk1", "scene": "12345"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "url": "https://work.weixin.qq.com/kf/kfcbf8f8d07ac7215f?enc_scene=ENCGFSDF567DF"
        })))
        .mount(&mock_server)
        .await;

    let work = work(&mock_server.uri());
    let list = work.kf_account_list().await.unwrap();
    assert_eq!(list.account_list.len(), 2);
    assert_eq!(list.account_list[1].open_kfid, "wk2");

    let contact = work
        .kf()
        .add_contact_way(&AddContactWayOptions {
            open_kfid: "wk1".to_string(),
            scene: Some("12345".to_string()),
        })
        .await
        .unwrap();
    assert!(contact.url.starts_with("https://work.weixin.qq.com/kf/"));
}
