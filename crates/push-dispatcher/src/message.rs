//! 推送消息信封
//!
//! 汇总模板文案、推送数据与平台投递提示，形成交给推送后端的完整消息。
//! 信封与具体后端无关，FCM 的线上格式在 [`crate::backend::fcm`] 中转换。

use chrono::{DateTime, Utc};
use immo_shared::events::{AndroidChannel, DeliveryTarget, NotificationEvent};

use crate::error::NotificationError;
use crate::payload::{CustomNotification, DataPayload, PayloadBuilder};
use crate::templates::NotificationTemplateEngine;

/// 默认提示音
pub const DEFAULT_SOUND: &str = "default";

/// iOS 角标数
pub const DEFAULT_BADGE_COUNT: u32 = 1;

/// 渲染完成、尚未指定投递目标的消息
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
    pub data: DataPayload,
    pub android_channel: AndroidChannel,
    pub android_color: Option<String>,
    pub ios_category: Option<String>,
    pub sound: String,
    pub badge_count: u32,
}

impl RenderedMessage {
    /// 由业务事件渲染消息
    pub fn from_event(
        event: &NotificationEvent,
        recipient_id: Option<&str>,
    ) -> Result<Self, NotificationError> {
        let template = NotificationTemplateEngine::render(event);
        let data = PayloadBuilder::build(event, recipient_id)?;

        Ok(Self {
            title: template.title,
            body: template.body,
            data,
            android_channel: event.android_channel(),
            android_color: Some(template.android_color.to_string()),
            ios_category: Some(template.ios_category.to_string()),
            sound: DEFAULT_SOUND.to_string(),
            badge_count: DEFAULT_BADGE_COUNT,
        })
    }

    /// 由自定义通知渲染消息，使用默认渠道
    pub fn from_custom(
        notification: &CustomNotification,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, NotificationError> {
        Ok(Self {
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: PayloadBuilder::build_custom(notification, sent_at)?,
            android_channel: AndroidChannel::Default,
            android_color: None,
            ios_category: None,
            sound: DEFAULT_SOUND.to_string(),
            badge_count: DEFAULT_BADGE_COUNT,
        })
    }

    /// 绑定投递目标
    pub fn to(self, target: DeliveryTarget) -> PushMessage {
        PushMessage {
            target,
            message: self,
        }
    }
}

/// 交给推送后端的消息：渲染结果加唯一投递目标
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub target: DeliveryTarget,
    pub message: RenderedMessage,
}
