//! 仅记录日志的推送后端
//!
//! 不触达任何外部服务，把消息内容写入日志并返回本地生成的消息标识，
//! 便于在没有 Firebase 凭据的环境中验证分发链路。

use async_trait::async_trait;
use immo_shared::events::DeliveryTarget;
use tracing::info;
use uuid::Uuid;

use super::PushBackend;
use crate::error::NotificationError;
use crate::message::PushMessage;

pub struct LogOnlyBackend;

#[async_trait]
impl PushBackend for LogOnlyBackend {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
        if let DeliveryTarget::Device(token) = &message.target {
            if token.trim().is_empty() {
                return Err(NotificationError::Backend {
                    code: "INVALID_ARGUMENT".to_string(),
                    reason: "empty registration token".to_string(),
                });
            }
        }

        let message_id = format!("projects/local/messages/{}", Uuid::now_v7());
        let rendered = &message.message;

        info!(
            backend = "log",
            delivery_target = %message.target.describe(),
            message_id = %message_id,
            title = %rendered.title,
            body = %rendered.body,
            channel = rendered.android_channel.as_str(),
            data = ?rendered.data,
            "模拟发送推送通知"
        );

        Ok(message_id)
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RenderedMessage;
    use crate::payload::CustomNotification;
    use chrono::Utc;
    use immo_shared::events::Topic;

    fn make_message(target: DeliveryTarget) -> PushMessage {
        let notification = CustomNotification {
            title: "🏠 Test Immobilier - Notification Rapide".to_string(),
            body: "Ceci est un test automatique".to_string(),
            screen: Some("home".to_string()),
            ..Default::default()
        };
        RenderedMessage::from_custom(&notification, Utc::now())
            .unwrap()
            .to(target)
    }

    #[tokio::test]
    async fn test_log_backend_send() {
        let result = LogOnlyBackend
            .send(&make_message(DeliveryTarget::Topic(Topic::AllUsers)))
            .await;

        let message_id = result.unwrap();
        assert!(message_id.starts_with("projects/local/messages/"));
    }

    #[tokio::test]
    async fn test_log_backend_ids_are_unique() {
        let message = make_message(DeliveryTarget::Device("fcm_token_123".to_string()));
        let first = LogOnlyBackend.send(&message).await.unwrap();
        let second = LogOnlyBackend.send(&message).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_log_backend_rejects_blank_token() {
        let err = LogOnlyBackend
            .send(&make_message(DeliveryTarget::Device("  ".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
