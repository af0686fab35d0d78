//! 通知业务服务
//!
//! 面向业务方的入口：根据业务 ID 查询用户与房源目录，组装事件后交给分发器。
//! 查询与分发中的错误直接向上返回，调用方决定记录后继续还是中止。

use std::sync::Arc;

use immo_shared::events::{
    DeliveryTarget, ListingStatus, ListingSummary, NotificationEvent, PaymentType,
    SearchCriteria, Topic,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::directory::{ListingDirectory, UserDirectory};
use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::error::NotificationError;

/// 单个收件人的分发结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub user_id: String,
    #[serde(flatten)]
    pub result: DispatchResult,
}

/// 一次业务通知的投递汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub outcomes: Vec<RecipientOutcome>,
}

impl DeliveryReport {
    fn single(user_id: &str, result: DispatchResult) -> Self {
        Self {
            outcomes: vec![RecipientOutcome {
                user_id: user_id.to_string(),
                result,
            }],
        }
    }

    /// 成功发送的通知数
    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_success()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.sent_count()
    }
}

/// 通知业务服务
pub struct NotificationService {
    users: Arc<dyn UserDirectory>,
    listings: Arc<dyn ListingDirectory>,
    dispatcher: Dispatcher,
}

impl NotificationService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        listings: Arc<dyn ListingDirectory>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            users,
            listings,
            dispatcher,
        }
    }

    /// 新房源匹配：通知所有保存过相似搜索的用户
    ///
    /// 按目录返回顺序逐个发送，任一后端错误中止后续发送。
    #[instrument(skip(self, criteria, listings), fields(location = ?criteria.location))]
    pub async fn notify_new_matching_listings(
        &self,
        criteria: &SearchCriteria,
        listings: &[ListingSummary],
    ) -> Result<DeliveryReport, NotificationError> {
        let event = NotificationEvent::NewMatchingListings {
            search_criteria: criteria.clone(),
            listings: listings.to_vec(),
        };
        self.fan_out(&event, criteria).await
    }

    /// 新消息：通知收件人，发送者姓名查不到时使用发送者 ID
    #[instrument(skip(self, content))]
    pub async fn notify_new_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<DispatchResult, NotificationError> {
        let recipient = self.users.lookup_user(recipient_id).await?;
        let sender_name = self
            .users
            .lookup_user(sender_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| sender_id.to_string());

        let event = NotificationEvent::NewMessage {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name,
            recipient_id: recipient_id.to_string(),
            message_preview: content.to_string(),
        };
        self.dispatcher
            .dispatch_to_user(&event, recipient.as_ref())
            .await
    }

    /// 房源状态变更：通知房源所有者
    #[instrument(skip(self))]
    pub async fn notify_listing_status_change(
        &self,
        listing_id: &str,
        old_status: ListingStatus,
        new_status: ListingStatus,
    ) -> Result<DispatchResult, NotificationError> {
        let listing = self
            .listings
            .lookup_listing(listing_id)
            .await?
            .ok_or_else(|| NotificationError::ListingNotFound {
                listing_id: listing_id.to_string(),
            })?;
        let owner = self.users.lookup_user(&listing.owner_id).await?;

        let event = NotificationEvent::ListingStatusChange {
            listing_id: listing.id,
            listing_title: listing.title,
            owner_id: listing.owner_id,
            old_status,
            new_status,
        };
        self.dispatcher.dispatch_to_user(&event, owner.as_ref()).await
    }

    /// 付款提醒
    #[instrument(skip(self))]
    pub async fn notify_payment_reminder(
        &self,
        user_id: &str,
        payment_type: PaymentType,
        due_date: &str,
        amount: f64,
    ) -> Result<DispatchResult, NotificationError> {
        let user = self.users.lookup_user(user_id).await?;
        let user_name = user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| user_id.to_string());

        let event = NotificationEvent::PaymentReminder {
            user_id: user_id.to_string(),
            user_name,
            payment_type,
            due_date: due_date.to_string(),
            amount,
        };
        self.dispatcher.dispatch_to_user(&event, user.as_ref()).await
    }

    /// 投递一个已组装好的事件
    ///
    /// 新房源匹配事件按搜索条件查找收件人，其余事件发给事件中指明的用户。
    pub async fn notify_event(
        &self,
        event: &NotificationEvent,
    ) -> Result<DeliveryReport, NotificationError> {
        match event {
            NotificationEvent::NewMatchingListings {
                search_criteria, ..
            } => self.fan_out(event, search_criteria).await,
            _ => {
                let user_id = event.recipient_id().unwrap_or_default();
                let user = self.users.lookup_user(user_id).await?;
                let result = self.dispatcher.dispatch_to_user(event, user.as_ref()).await?;
                Ok(DeliveryReport::single(user_id, result))
            }
        }
    }

    /// 向主题广播事件，未指定主题时使用事件的默认主题
    pub async fn broadcast(
        &self,
        event: &NotificationEvent,
        topic: Option<Topic>,
    ) -> Result<DispatchResult, NotificationError> {
        let topic = topic.unwrap_or_else(|| event.default_topic());
        self.dispatcher
            .dispatch(event, &DeliveryTarget::Topic(topic))
            .await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    async fn fan_out(
        &self,
        event: &NotificationEvent,
        criteria: &SearchCriteria,
    ) -> Result<DeliveryReport, NotificationError> {
        let users = self.users.lookup_users_matching_search(criteria).await?;

        let mut report = DeliveryReport::default();
        for user in &users {
            let result = self.dispatcher.dispatch_to_user(event, Some(user)).await?;
            report.outcomes.push(RecipientOutcome {
                user_id: user.id.clone(),
                result,
            });
        }

        info!(
            recipients = users.len(),
            sent = report.sent_count(),
            "新房源匹配通知发送完成"
        );
        Ok(report)
    }
}
