//! Official account parametric QR codes
//!
//! # Endpoints
//!
//! - [`QrCodeApi::get_qr_ticket`] - Create a temporary or permanent QR code ticket
//! - [`show_qrcode_url`] - Image URL for a ticket

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use super::{WechatApi, WechatContext};
use crate::error::WechatError;

const QR_CREATE_PATH: &str = "/cgi-bin/qrcode/create";
const SHOW_QRCODE_URL: &str = "https://mp.weixin.qq.com/cgi-bin/showqrcode";

/// Scene value carried by a QR code.
///
/// Serializes as `{"scene_str": ..}` or `{"scene_id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Scene {
    #[serde(rename = "scene_str")]
    Str(String),
    #[serde(rename = "scene_id")]
    Id(u32),
}

impl From<&str> for Scene {
    fn from(scene: &str) -> Self {
        Scene::Str(scene.to_string())
    }
}

impl From<String> for Scene {
    fn from(scene: String) -> Self {
        Scene::Str(scene)
    }
}

impl From<u32> for Scene {
    fn from(scene: u32) -> Self {
        Scene::Id(scene)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QrActionName {
    #[serde(rename = "QR_SCENE")]
    Scene,
    #[serde(rename = "QR_STR_SCENE")]
    StrScene,
    #[serde(rename = "QR_LIMIT_SCENE")]
    LimitScene,
    #[serde(rename = "QR_LIMIT_STR_SCENE")]
    LimitStrScene,
}

#[derive(Debug, Clone, Serialize)]
struct ActionInfo {
    scene: Scene,
}

/// Body of `POST /cgi-bin/qrcode/create`
#[derive(Debug, Clone, Serialize)]
pub struct QrCodeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_seconds: Option<u64>,
    action_name: QrActionName,
    action_info: ActionInfo,
}

impl QrCodeRequest {
    /// Temporary QR code valid for `expire`.
    pub fn temporary(expire: Duration, scene: impl Into<Scene>) -> Self {
        let scene = scene.into();
        let action_name = match scene {
            Scene::Str(_) => QrActionName::StrScene,
            Scene::Id(_) => QrActionName::Scene,
        };
        Self {
            expire_seconds: Some(expire.as_secs()),
            action_name,
            action_info: ActionInfo { scene },
        }
    }

    /// Permanent QR code.
    pub fn permanent(scene: impl Into<Scene>) -> Self {
        let scene = scene.into();
        let action_name = match scene {
            Scene::Str(_) => QrActionName::LimitStrScene,
            Scene::Id(_) => QrActionName::LimitScene,
        };
        Self {
            expire_seconds: None,
            action_name,
            action_info: ActionInfo { scene },
        }
    }

    pub fn action_name(&self) -> QrActionName {
        self.action_name
    }

    pub fn scene(&self) -> &Scene {
        &self.action_info.scene
    }
}

/// QR code ticket
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QrCodeTicket {
    pub ticket: String,
    /// Absent for permanent codes
    #[serde(default)]
    pub expire_seconds: u64,
    /// Content encoded in the QR image
    #[serde(default)]
    pub url: String,
}

/// URL of the QR code image for `ticket`.
pub fn show_qrcode_url(ticket: &QrCodeTicket) -> String {
    format!(
        "{}?ticket={}",
        SHOW_QRCODE_URL,
        utf8_percent_encode(&ticket.ticket, NON_ALPHANUMERIC)
    )
}

/// Official account QR code API
pub struct QrCodeApi {
    context: Arc<WechatContext>,
}

impl QrCodeApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Create a QR code ticket
    ///
    /// POST /cgi-bin/qrcode/create?access_token=ACCESS_TOKEN
    pub async fn get_qr_ticket(&self, request: &QrCodeRequest) -> Result<QrCodeTicket, WechatError> {
        let path = self.context.authorized_path(QR_CREATE_PATH).await?;
        self.context.client.post(&path, request).await
    }
}

impl WechatApi for QrCodeApi {
    fn context(&self) -> &WechatContext {
        &self.context
    }
}
