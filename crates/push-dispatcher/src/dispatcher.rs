//! 推送分发器
//!
//! 把事件渲染为推送消息并交给推送后端，每次分发恰好一次后端调用。
//! 投递目标由调用方决定：设备 token、主题，或目录中的用户。
//! 后端错误原样返回给调用方，是否继续由调用方决定。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use immo_shared::events::{DeliveryTarget, NotificationEvent};
use immo_shared::observability::metrics::record_dispatch;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::PushBackend;
use crate::directory::UserRecord;
use crate::error::NotificationError;
use crate::message::{PushMessage, RenderedMessage};
use crate::payload::CustomNotification;

/// 收件人缺少设备 token 时的失败原因
pub const NO_PUSH_TOKEN: &str = "No FCM token found";

const CUSTOM_EVENT: &str = "custom";

/// 单次分发结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    Success { message_id: String },
    Failure { reason: String },
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Success { message_id } => Some(message_id),
            Self::Failure { .. } => None,
        }
    }
}

/// 推送分发器
///
/// 持有共享的推送后端句柄，本身无状态，可以并发调用。
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn PushBackend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn PushBackend>) -> Self {
        Self { backend }
    }

    /// 向指定目标分发事件
    pub async fn dispatch(
        &self,
        event: &NotificationEvent,
        target: &DeliveryTarget,
    ) -> Result<DispatchResult, NotificationError> {
        let message = RenderedMessage::from_event(event, None)?.to(target.clone());
        self.deliver(event.type_name(), message).await
    }

    /// 向目录中的用户分发事件
    ///
    /// 用户不存在或没有设备 token 时返回 [`DispatchResult::Failure`]，不调用后端。
    pub async fn dispatch_to_user(
        &self,
        event: &NotificationEvent,
        user: Option<&UserRecord>,
    ) -> Result<DispatchResult, NotificationError> {
        let Some((user, token)) = user.and_then(|u| {
            u.push_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| (u, t))
        }) else {
            warn!(
                event = event.type_name(),
                user_id = user.map(|u| u.id.as_str()).unwrap_or_default(),
                "收件人没有设备 token，跳过推送"
            );
            record_dispatch(event.type_name(), "skipped", Duration::ZERO);
            return Ok(DispatchResult::Failure {
                reason: NO_PUSH_TOKEN.to_string(),
            });
        };

        let message = RenderedMessage::from_event(event, Some(&user.id))?
            .to(DeliveryTarget::Device(token.to_string()));
        self.deliver(event.type_name(), message).await
    }

    /// 分发自定义通知，发送时间写入推送数据
    pub async fn dispatch_custom(
        &self,
        notification: &CustomNotification,
        target: &DeliveryTarget,
    ) -> Result<DispatchResult, NotificationError> {
        let message = RenderedMessage::from_custom(notification, Utc::now())?.to(target.clone());
        self.deliver(CUSTOM_EVENT, message).await
    }

    async fn deliver(
        &self,
        event: &'static str,
        message: PushMessage,
    ) -> Result<DispatchResult, NotificationError> {
        let started = Instant::now();
        let result = self.backend.send(&message).await;
        let elapsed = started.elapsed();

        match result {
            Ok(message_id) => {
                record_dispatch(event, "success", elapsed);
                info!(
                    event,
                    delivery_target = %message.target.describe(),
                    message_id = %message_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "推送通知已发送"
                );
                Ok(DispatchResult::Success { message_id })
            }
            Err(e) => {
                record_dispatch(event, "error", elapsed);
                error!(
                    event,
                    delivery_target = %message.target.describe(),
                    code = e.code(),
                    error = %e,
                    "推送通知发送失败"
                );
                Err(e)
            }
        }
    }
}
