//! FCM HTTP v1 推送后端
//!
//! `POST {endpoint}/v1/projects/{project_id}/messages:send`，请求体为
//! `{"message": {...}}`。成功响应中的 `name` 作为消息标识返回；失败响应优先取
//! `details[].errorCode`（如 `UNREGISTERED`），其次取 `status`，都没有时用 HTTP 状态码。

use async_trait::async_trait;
use immo_shared::events::DeliveryTarget;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PushBackend;
use super::auth::{AccessTokenProvider, ServiceAccountKey};
use crate::error::NotificationError;
use crate::message::PushMessage;
use crate::payload::DataPayload;

// ---------------------------------------------------------------------------
// 线上格式
// ---------------------------------------------------------------------------

/// 所有通知都以高优先级投递
const ANDROID_PRIORITY: &str = "HIGH";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    validate_only: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    #[serde(flatten)]
    target: &'a DeliveryTarget,
    notification: WireNotification<'a>,
    data: &'a DataPayload,
    android: WireAndroid<'a>,
    apns: WireApns<'a>,
}

#[derive(Debug, Serialize)]
struct WireNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct WireAndroid<'a> {
    priority: &'static str,
    notification: WireAndroidNotification<'a>,
}

#[derive(Debug, Serialize)]
struct WireAndroidNotification<'a> {
    sound: &'a str,
    channel_id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireApns<'a> {
    payload: WireApnsPayload<'a>,
}

#[derive(Debug, Serialize)]
struct WireApnsPayload<'a> {
    aps: WireAps<'a>,
}

#[derive(Debug, Serialize)]
struct WireAps<'a> {
    sound: &'a str,
    badge: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

impl<'a> SendRequest<'a> {
    fn new(push: &'a PushMessage, validate_only: bool) -> Self {
        let rendered = &push.message;
        Self {
            message: WireMessage {
                target: &push.target,
                notification: WireNotification {
                    title: &rendered.title,
                    body: &rendered.body,
                },
                data: &rendered.data,
                android: WireAndroid {
                    priority: ANDROID_PRIORITY,
                    notification: WireAndroidNotification {
                        sound: &rendered.sound,
                        channel_id: rendered.android_channel.as_str(),
                        color: rendered.android_color.as_deref(),
                    },
                },
                apns: WireApns {
                    payload: WireApnsPayload {
                        aps: WireAps {
                            sound: &rendered.sound,
                            badge: rendered.badge_count,
                            category: rendered.ios_category.as_deref(),
                        },
                    },
                },
            },
            validate_only,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// 把 FCM 错误响应转换为带错误码的后端错误
fn parse_error(status: StatusCode, body: &str) -> NotificationError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let error = envelope.error;
            let code = error
                .details
                .iter()
                .find_map(|d| d.error_code.clone())
                .or(error.status)
                .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()));
            NotificationError::Backend {
                code,
                reason: error.message,
            }
        }
        Err(_) => NotificationError::Backend {
            code: format!("HTTP_{}", status.as_u16()),
            reason: body.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// FcmBackend
// ---------------------------------------------------------------------------

pub struct FcmBackend {
    http: reqwest::Client,
    send_url: String,
    tokens: AccessTokenProvider,
    validate_only: bool,
}

impl FcmBackend {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        key: ServiceAccountKey,
        validate_only: bool,
    ) -> Result<Self, NotificationError> {
        let http = reqwest::Client::builder().build()?;
        let tokens = AccessTokenProvider::new(key, http.clone())?;

        Ok(Self {
            http,
            send_url: send_url(endpoint, project_id),
            tokens,
            validate_only,
        })
    }
}

fn send_url(endpoint: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{project_id}/messages:send",
        endpoint.trim_end_matches('/')
    )
}

#[async_trait]
impl PushBackend for FcmBackend {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
        let access_token = self.tokens.access_token().await?;
        let request = SendRequest::new(message, self.validate_only);

        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let sent: SendResponse = response.json().await?;
            debug!(message_id = %sent.name, "FCM 已接受消息");
            return Ok(sent.name);
        }

        let body = response.text().await.unwrap_or_default();
        let err = parse_error(status, &body);
        warn!(
            http_status = status.as_u16(),
            code = err.code(),
            delivery_target = %message.target.describe(),
            "FCM 拒绝消息"
        );
        Err(err)
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}
