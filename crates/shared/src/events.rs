//! 通知事件定义
//!
//! 房源、消息、支付等业务动作完成后产生的通知事件，以及推送投递相关的固定词汇
//! （主题、Android 通知渠道、投递目标）。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::SharedError;

// ---------------------------------------------------------------------------
// 房源状态 / 支付类型
// ---------------------------------------------------------------------------

/// 房源状态
///
/// 上游可能新增状态值，未识别的值保留原文放入 `Other`，不视为错误。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
    Expired,
    Other(String),
}

impl ListingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Sold => "SOLD",
            Self::Expired => "EXPIRED",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ListingStatus {
    fn from(value: &str) -> Self {
        match value {
            "PENDING" => Self::Pending,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            "SOLD" => Self::Sold,
            "EXPIRED" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ListingStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ListingStatus> for String {
    fn from(value: ListingStatus) -> Self {
        match value {
            ListingStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 支付类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentType {
    Subscription,
    ListingFee,
    PremiumFeatures,
    Other(String),
}

impl PaymentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subscription => "SUBSCRIPTION",
            Self::ListingFee => "LISTING_FEE",
            Self::PremiumFeatures => "PREMIUM_FEATURES",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for PaymentType {
    fn from(value: &str) -> Self {
        match value {
            "SUBSCRIPTION" => Self::Subscription,
            "LISTING_FEE" => Self::ListingFee,
            "PREMIUM_FEATURES" => Self::PremiumFeatures,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PaymentType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<PaymentType> for String {
    fn from(value: PaymentType) -> Self {
        match value {
            PaymentType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// 搜索条件 / 房源摘要
// ---------------------------------------------------------------------------

/// 用户保存的搜索条件
///
/// 除常用字段外保留任意附加键，原样回传给客户端。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 推送中携带的房源摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    /// 价格（欧元），租金等可能带小数
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// 整数价格输出为 JSON 整数（350000 而不是 350000.0），其余原样输出
fn serialize_price<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if price.is_finite() && price.fract() == 0.0 && price.abs() <= MAX_EXACT {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}

// ---------------------------------------------------------------------------
// NotificationEvent — 通知事件
// ---------------------------------------------------------------------------

/// 通知事件
///
/// 每个变体携带渲染对应模板所需的全部字段。序列化时以 `type` 字段区分变体，
/// 取值与推送数据中的 `type` 一致，便于直接从事件文件回放。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    NewMatchingListings {
        search_criteria: SearchCriteria,
        listings: Vec<ListingSummary>,
    },
    NewMessage {
        conversation_id: String,
        sender_id: String,
        sender_name: String,
        recipient_id: String,
        message_preview: String,
    },
    ListingStatusChange {
        listing_id: String,
        listing_title: String,
        owner_id: String,
        old_status: ListingStatus,
        new_status: ListingStatus,
    },
    PaymentReminder {
        user_id: String,
        user_name: String,
        payment_type: PaymentType,
        due_date: String,
        amount: f64,
    },
}

impl NotificationEvent {
    /// 推送数据中的 `type` 取值
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NewMatchingListings { .. } => "new_matching_listings",
            Self::NewMessage { .. } => "new_message",
            Self::ListingStatusChange { .. } => "listing_status_change",
            Self::PaymentReminder { .. } => "payment_reminder",
        }
    }

    /// 事件对应的 Android 通知渠道
    pub fn android_channel(&self) -> AndroidChannel {
        match self {
            Self::NewMatchingListings { .. } => AndroidChannel::NewListings,
            Self::NewMessage { .. } => AndroidChannel::Messages,
            Self::ListingStatusChange { .. } => AndroidChannel::ListingStatus,
            Self::PaymentReminder { .. } => AndroidChannel::Payments,
        }
    }

    /// 广播时使用的默认主题
    pub fn default_topic(&self) -> Topic {
        match self {
            Self::NewMatchingListings { .. } => Topic::NewListingAlerts,
            Self::NewMessage { .. } => Topic::MessageNotifications,
            Self::ListingStatusChange { .. } => Topic::Owners,
            Self::PaymentReminder { .. } => Topic::AllUsers,
        }
    }

    /// 事件本身指明的接收用户；新房源匹配事件需要按搜索条件查找接收人
    pub fn recipient_id(&self) -> Option<&str> {
        match self {
            Self::NewMatchingListings { .. } => None,
            Self::NewMessage { recipient_id, .. } => Some(recipient_id),
            Self::ListingStatusChange { owner_id, .. } => Some(owner_id),
            Self::PaymentReminder { user_id, .. } => Some(user_id),
        }
    }
}

// ---------------------------------------------------------------------------
// 主题 / 通知渠道 / 投递目标
// ---------------------------------------------------------------------------

/// 订阅主题（固定词汇）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    NewListingAlerts,
    PriceDropAlerts,
    MessageNotifications,
    Owners,
    Buyers,
    AllUsers,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::NewListingAlerts,
        Topic::PriceDropAlerts,
        Topic::MessageNotifications,
        Topic::Owners,
        Topic::Buyers,
        Topic::AllUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewListingAlerts => "new_listing_alerts",
            Self::PriceDropAlerts => "price_drop_alerts",
            Self::MessageNotifications => "message_notifications",
            Self::Owners => "owners",
            Self::Buyers => "buyers",
            Self::AllUsers => "all_users",
        }
    }
}

impl FromStr for Topic {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| SharedError::InvalidArgument {
                field: "topic".to_string(),
                message: format!("未知主题 {s}"),
            })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Android 通知渠道（固定词汇）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AndroidChannel {
    NewListings,
    Messages,
    ListingStatus,
    Payments,
    Default,
}

impl AndroidChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewListings => "new_listings",
            Self::Messages => "messages",
            Self::ListingStatus => "listing_status",
            Self::Payments => "payments",
            Self::Default => "default",
        }
    }
}

/// 投递目标：单个设备或订阅主题，二者必居其一
///
/// 序列化形态与 FCM 消息一致：`{"token": ...}` 或 `{"topic": ...}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTarget {
    #[serde(rename = "token")]
    Device(String),
    Topic(Topic),
}

impl DeliveryTarget {
    /// 日志中使用的目标描述，设备 token 只保留前 8 个字符
    pub fn describe(&self) -> String {
        match self {
            Self::Device(token) => {
                let prefix: String = token.chars().take(8).collect();
                format!("device:{prefix}…")
            }
            Self::Topic(topic) => format!("topic:{topic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_status_event() -> NotificationEvent {
        NotificationEvent::ListingStatusChange {
            listing_id: "listing_123".to_string(),
            listing_title: "Appartement 4 pièces avec balcon".to_string(),
            owner_id: "user_789".to_string(),
            old_status: ListingStatus::Pending,
            new_status: ListingStatus::Approved,
        }
    }

    #[test]
    fn test_listing_status_parsing() {
        assert_eq!(ListingStatus::from("APPROVED"), ListingStatus::Approved);
        assert_eq!(
            ListingStatus::from("ARCHIVED"),
            ListingStatus::Other("ARCHIVED".to_string())
        );
        // 大小写敏感
        assert_eq!(
            ListingStatus::from("approved"),
            ListingStatus::Other("approved".to_string())
        );
        assert_eq!(ListingStatus::Other("ARCHIVED".to_string()).as_str(), "ARCHIVED");
    }

    #[test]
    fn test_payment_type_parsing() {
        assert_eq!(PaymentType::from("LISTING_FEE"), PaymentType::ListingFee);
        assert_eq!(PaymentType::from("DONATION").as_str(), "DONATION");
        assert_eq!(PaymentType::PremiumFeatures.to_string(), "PREMIUM_FEATURES");
    }

    #[test]
    fn test_event_serialization_is_type_tagged() {
        let json = serde_json::to_value(make_status_event()).unwrap();

        assert_eq!(json["type"], "listing_status_change");
        assert_eq!(json["listingId"], "listing_123");
        assert_eq!(json["oldStatus"], "PENDING");
        assert_eq!(json["newStatus"], "APPROVED");

        let back: NotificationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, make_status_event());
    }

    #[test]
    fn test_event_deserialize_unknown_status() {
        let json = serde_json::json!({
            "type": "listing_status_change",
            "listingId": "listing_1",
            "listingTitle": "Studio",
            "ownerId": "user_1",
            "oldStatus": "APPROVED",
            "newStatus": "ARCHIVED"
        });
        let event: NotificationEvent = serde_json::from_value(json).unwrap();
        match event {
            NotificationEvent::ListingStatusChange { new_status, .. } => {
                assert_eq!(new_status, ListingStatus::Other("ARCHIVED".to_string()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_search_criteria_keeps_extra_keys() {
        let json = serde_json::json!({
            "id": "search_456",
            "location": "Paris",
            "rooms": 3
        });
        let criteria: SearchCriteria = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(criteria.id.as_deref(), Some("search_456"));
        assert_eq!(criteria.extra.get("rooms"), Some(&serde_json::json!(3)));
        assert_eq!(serde_json::to_value(&criteria).unwrap(), json);
    }

    #[test]
    fn test_event_routing_metadata() {
        let event = make_status_event();
        assert_eq!(event.type_name(), "listing_status_change");
        assert_eq!(event.android_channel(), AndroidChannel::ListingStatus);
        assert_eq!(event.default_topic(), Topic::Owners);
        assert_eq!(event.recipient_id(), Some("user_789"));

        let listings = NotificationEvent::NewMatchingListings {
            search_criteria: SearchCriteria::default(),
            listings: vec![],
        };
        assert_eq!(listings.recipient_id(), None);
        assert_eq!(listings.default_topic(), Topic::NewListingAlerts);
    }

    #[test]
    fn test_topic_from_str() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        let err = "vip_users".parse::<Topic>().unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_delivery_target_serialization() {
        let device = DeliveryTarget::Device("fcm_token_123".to_string());
        assert_eq!(
            serde_json::to_value(&device).unwrap(),
            serde_json::json!({"token": "fcm_token_123"})
        );
        assert_eq!(device.describe(), "device:fcm_toke…");

        let topic = DeliveryTarget::Topic(Topic::AllUsers);
        assert_eq!(
            serde_json::to_value(&topic).unwrap(),
            serde_json::json!({"topic": "all_users"})
        );
        assert_eq!(topic.describe(), "topic:all_users");
    }

    #[test]
    fn test_listing_price_keeps_decimals() {
        let event: NotificationEvent = serde_json::from_value(serde_json::json!({
            "type": "new_matching_listings",
            "searchCriteria": {"location": "Lyon"},
            "listings": [
                {"id": "l1", "title": "Location T2", "price": 1250.5},
                {"id": "l2", "title": "Maison", "price": 350000}
            ]
        }))
        .unwrap();

        let NotificationEvent::NewMatchingListings { listings, .. } = &event else {
            panic!("预期 NewMatchingListings 事件");
        };
        assert_eq!(listings[0].price, 1250.5);

        let json = serde_json::to_string(listings).unwrap();
        assert!(json.contains(r#""price":1250.5"#));
        assert!(json.contains(r#""price":350000"#));
        assert!(!json.contains("350000.0"));
    }
}
