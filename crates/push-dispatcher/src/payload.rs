//! 推送数据构建
//!
//! 生成随通知一起下发的 `data` 字段。客户端点击通知后依据 `screen` 与 `params`
//! 做应用内跳转。FCM 要求 data 的值全部为字符串，因此数值与布尔值转为文本，
//! 嵌套结构（房源列表、搜索条件、跳转参数）序列化为 JSON 字符串，由客户端解码。

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use immo_shared::events::NotificationEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::NotificationError;
use crate::templates::format_amount;

/// 字符串到字符串的推送数据
pub type DataPayload = BTreeMap<String, String>;

/// 推送数据构建器
pub struct PayloadBuilder;

impl PayloadBuilder {
    /// 构建事件的推送数据
    ///
    /// `recipient_id` 仅在新房源匹配事件按用户投递时写入 `userId`，其余事件的
    /// 接收人已包含在事件字段中。
    pub fn build(
        event: &NotificationEvent,
        recipient_id: Option<&str>,
    ) -> Result<DataPayload, NotificationError> {
        let mut data = DataPayload::new();
        data.insert("type".to_string(), event.type_name().to_string());

        match event {
            NotificationEvent::NewMatchingListings {
                search_criteria,
                listings,
            } => {
                if let Some(user_id) = recipient_id {
                    data.insert("userId".to_string(), user_id.to_string());
                }
                data.insert(
                    "searchCriteria".to_string(),
                    serde_json::to_string(search_criteria)?,
                );
                data.insert("listingsCount".to_string(), listings.len().to_string());
                data.insert("listings".to_string(), serde_json::to_string(listings)?);
            }
            NotificationEvent::NewMessage {
                conversation_id,
                sender_id,
                sender_name,
                message_preview,
                ..
            } => {
                data.insert("senderId".to_string(), sender_id.clone());
                data.insert("senderName".to_string(), sender_name.clone());
                data.insert("conversationId".to_string(), conversation_id.clone());
                // 正文会截断，data 中保留完整内容
                data.insert("messagePreview".to_string(), message_preview.clone());
            }
            NotificationEvent::ListingStatusChange {
                listing_id,
                listing_title,
                old_status,
                new_status,
                ..
            } => {
                data.insert("listingId".to_string(), listing_id.clone());
                data.insert("oldStatus".to_string(), old_status.to_string());
                data.insert("newStatus".to_string(), new_status.to_string());
                data.insert("listingTitle".to_string(), listing_title.clone());
            }
            NotificationEvent::PaymentReminder {
                user_name,
                payment_type,
                due_date,
                amount,
                ..
            } => {
                data.insert("paymentType".to_string(), payment_type.to_string());
                data.insert("dueDate".to_string(), due_date.clone());
                data.insert("amount".to_string(), format_amount(*amount));
                data.insert("userName".to_string(), user_name.clone());
            }
        }

        data.insert("screen".to_string(), Self::screen(event).to_string());
        data.insert(
            "params".to_string(),
            serde_json::to_string(&Self::params(event))?,
        );

        Ok(data)
    }

    /// 点击通知后客户端跳转的页面
    pub fn screen(event: &NotificationEvent) -> &'static str {
        match event {
            NotificationEvent::NewMatchingListings { .. } => "search_results",
            NotificationEvent::NewMessage { .. } => "chat",
            NotificationEvent::ListingStatusChange { .. } => "my_listings",
            NotificationEvent::PaymentReminder { .. } => "payment",
        }
    }

    /// 跳转参数
    pub fn params(event: &NotificationEvent) -> Value {
        match event {
            NotificationEvent::NewMatchingListings {
                search_criteria, ..
            } => {
                let mut params = Map::new();
                // 搜索条件没有 id 时不输出 searchId
                if let Some(search_id) = &search_criteria.id {
                    params.insert("searchId".to_string(), json!(search_id));
                }
                params.insert("highlightNew".to_string(), json!(true));
                Value::Object(params)
            }
            NotificationEvent::NewMessage {
                conversation_id, ..
            } => json!({
                "conversationId": conversation_id,
                "highlightNew": true,
            }),
            NotificationEvent::ListingStatusChange {
                listing_id,
                new_status,
                ..
            } => json!({
                "listingId": listing_id,
                "highlightStatus": new_status.as_str(),
            }),
            NotificationEvent::PaymentReminder { payment_type, .. } => json!({
                "paymentType": payment_type.as_str(),
                "highlightUrgent": true,
            }),
        }
    }

    /// 构建自定义通知的推送数据，附带发送时间戳
    pub fn build_custom(
        notification: &CustomNotification,
        sent_at: DateTime<Utc>,
    ) -> Result<DataPayload, NotificationError> {
        let mut data = notification.data.clone();
        if let Some(screen) = &notification.screen {
            data.insert("screen".to_string(), screen.clone());
        }
        if let Some(params) = &notification.params {
            data.insert("params".to_string(), serde_json::to_string(params)?);
        }
        data.insert(
            "timestamp".to_string(),
            sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        Ok(data)
    }
}

/// 自定义通知
///
/// 不属于四类业务事件的临时推送（运营公告、联调测试等），使用默认通知渠道，
/// 不带颜色与 iOS 类别。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNotification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: DataPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use immo_shared::events::{ListingStatus, ListingSummary, PaymentType, SearchCriteria};

    fn make_listings_event() -> NotificationEvent {
        NotificationEvent::NewMatchingListings {
            search_criteria: SearchCriteria {
                id: Some("search_456".to_string()),
                location: Some("Paris".to_string()),
                price_range: Some("200000-500000".to_string()),
                property_type: Some("appartement".to_string()),
                ..Default::default()
            },
            listings: vec![
                ListingSummary {
                    id: "listing_789".to_string(),
                    title: "Appartement 3 pièces Paris 15ème".to_string(),
                    price: 350_000.0,
                    location: Some("Paris 15ème".to_string()),
                },
                ListingSummary {
                    id: "listing_790".to_string(),
                    title: "Studio moderne Paris 11ème".to_string(),
                    price: 280_000.0,
                    location: None,
                },
            ],
        }
    }

    #[test]
    fn test_build_new_matching_listings() {
        let data = PayloadBuilder::build(&make_listings_event(), Some("user_123")).unwrap();

        assert_eq!(data["type"], "new_matching_listings");
        assert_eq!(data["userId"], "user_123");
        assert_eq!(data["listingsCount"], "2");
        assert_eq!(data["screen"], "search_results");

        let criteria: Value = serde_json::from_str(&data["searchCriteria"]).unwrap();
        assert_eq!(
            criteria,
            json!({
                "id": "search_456",
                "location": "Paris",
                "priceRange": "200000-500000",
                "propertyType": "appartement"
            })
        );

        let listings: Value = serde_json::from_str(&data["listings"]).unwrap();
        assert_eq!(
            listings,
            json!([
                {"id": "listing_789", "title": "Appartement 3 pièces Paris 15ème", "price": 350000, "location": "Paris 15ème"},
                {"id": "listing_790", "title": "Studio moderne Paris 11ème", "price": 280000}
            ])
        );
    }

    #[test]
    fn test_params_round_trip() {
        let data = PayloadBuilder::build(&make_listings_event(), None).unwrap();
        let params: Value = serde_json::from_str(&data["params"]).unwrap();
        assert_eq!(params, json!({"searchId": "search_456", "highlightNew": true}));
        // 未指定接收人时不写 userId
        assert!(!data.contains_key("userId"));
    }

    #[test]
    fn test_params_without_search_id() {
        let event = NotificationEvent::NewMatchingListings {
            search_criteria: SearchCriteria::default(),
            listings: vec![],
        };
        let data = PayloadBuilder::build(&event, None).unwrap();
        assert_eq!(data["params"], r#"{"highlightNew":true}"#);
        assert_eq!(data["searchCriteria"], "{}");
        assert_eq!(data["listings"], "[]");
        assert_eq!(data["listingsCount"], "0");
    }

    #[test]
    fn test_listings_keep_decimal_price() {
        let event = NotificationEvent::NewMatchingListings {
            search_criteria: SearchCriteria::default(),
            listings: vec![ListingSummary {
                id: "l1".to_string(),
                title: "Location T2".to_string(),
                price: 1250.5,
                location: None,
            }],
        };

        let data = PayloadBuilder::build(&event, None).unwrap();
        assert_eq!(
            data["listings"],
            r#"[{"id":"l1","title":"Location T2","price":1250.5}]"#
        );
    }

    #[test]
    fn test_build_new_message_keeps_full_preview() {
        let preview = "x".repeat(80);
        let event = NotificationEvent::NewMessage {
            conversation_id: "conversation_789".to_string(),
            sender_id: "user_456".to_string(),
            sender_name: "Marie Dupont".to_string(),
            recipient_id: "user_123".to_string(),
            message_preview: preview.clone(),
        };

        let data = PayloadBuilder::build(&event, Some("ignored")).unwrap();
        assert_eq!(data["type"], "new_message");
        assert_eq!(data["senderId"], "user_456");
        assert_eq!(data["senderName"], "Marie Dupont");
        assert_eq!(data["conversationId"], "conversation_789");
        assert_eq!(data["messagePreview"], preview);
        assert_eq!(data["screen"], "chat");
        assert!(!data.contains_key("userId"));

        let params: Value = serde_json::from_str(&data["params"]).unwrap();
        assert_eq!(
            params,
            json!({"conversationId": "conversation_789", "highlightNew": true})
        );
    }

    #[test]
    fn test_build_listing_status_change() {
        let event = NotificationEvent::ListingStatusChange {
            listing_id: "listing_123".to_string(),
            listing_title: "Maison avec jardin".to_string(),
            owner_id: "user_789".to_string(),
            old_status: ListingStatus::Pending,
            new_status: ListingStatus::Other("ARCHIVED".to_string()),
        };

        let data = PayloadBuilder::build(&event, None).unwrap();
        assert_eq!(data["type"], "listing_status_change");
        assert_eq!(data["oldStatus"], "PENDING");
        assert_eq!(data["newStatus"], "ARCHIVED");
        assert_eq!(data["listingTitle"], "Maison avec jardin");
        assert_eq!(data["screen"], "my_listings");

        let params: Value = serde_json::from_str(&data["params"]).unwrap();
        assert_eq!(
            params,
            json!({"listingId": "listing_123", "highlightStatus": "ARCHIVED"})
        );
    }

    #[test]
    fn test_build_payment_reminder() {
        let event = NotificationEvent::PaymentReminder {
            user_id: "user_101".to_string(),
            user_name: "Jean Martin".to_string(),
            payment_type: PaymentType::Subscription,
            due_date: "2024-02-15".to_string(),
            amount: 29.99,
        };

        let data = PayloadBuilder::build(&event, None).unwrap();
        assert_eq!(data["type"], "payment_reminder");
        assert_eq!(data["paymentType"], "SUBSCRIPTION");
        assert_eq!(data["dueDate"], "2024-02-15");
        assert_eq!(data["amount"], "29.99");
        assert_eq!(data["userName"], "Jean Martin");
        assert_eq!(data["screen"], "payment");

        let params: Value = serde_json::from_str(&data["params"]).unwrap();
        assert_eq!(
            params,
            json!({"paymentType": "SUBSCRIPTION", "highlightUrgent": true})
        );
    }

    #[test]
    fn test_build_custom_adds_timestamp() {
        let mut data = DataPayload::new();
        data.insert("type".to_string(), "price_drop".to_string());
        let notification = CustomNotification {
            title: "💰 Prix réduit!".to_string(),
            body: "Le prix de cette propriété a été réduit de 10%".to_string(),
            data,
            screen: Some("property_details".to_string()),
            params: Some(json!({"id": "12345", "highlightPrice": true})),
        };
        let sent_at = Utc.with_ymd_and_hms(2024, 2, 15, 9, 30, 0).unwrap();

        let payload = PayloadBuilder::build_custom(&notification, sent_at).unwrap();
        assert_eq!(payload["type"], "price_drop");
        assert_eq!(payload["screen"], "property_details");
        assert_eq!(payload["timestamp"], "2024-02-15T09:30:00.000Z");

        let params: Value = serde_json::from_str(&payload["params"]).unwrap();
        assert_eq!(params, json!({"id": "12345", "highlightPrice": true}));
    }
}
