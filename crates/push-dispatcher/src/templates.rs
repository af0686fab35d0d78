//! 通知模板
//!
//! 根据通知事件生成标题、正文以及平台展示提示（Android 图标颜色、iOS 通知类别）。
//! 模板为硬编码文案，对所有输入都能给出结果：未识别的房源状态或支付类型
//! 走通用兜底模板，而不是报错。

use immo_shared::events::{ListingStatus, NotificationEvent, PaymentType};

/// 消息预览在通知正文中保留的最大字符数
pub const PREVIEW_MAX_CHARS: usize = 50;

/// 预览被截断时追加的省略标记
pub const ELLIPSIS: &str = "...";

const COLOR_GREEN: &str = "#4CAF50";
const COLOR_BLUE: &str = "#2196F3";
const COLOR_RED: &str = "#F44336";
const COLOR_ORANGE: &str = "#FF9800";
const COLOR_DEEP_ORANGE: &str = "#FF5722";
const COLOR_BLUE_GREY: &str = "#607D8B";

/// 模板渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub title: String,
    pub body: String,
    pub android_color: &'static str,
    pub ios_category: &'static str,
}

/// 通知模板引擎
pub struct NotificationTemplateEngine;

impl NotificationTemplateEngine {
    /// 渲染事件对应的通知文案
    pub fn render(event: &NotificationEvent) -> RenderedTemplate {
        match event {
            NotificationEvent::NewMatchingListings { listings, .. } => RenderedTemplate {
                title: "🏠 Nouvelles annonces trouvées !".to_string(),
                body: format!(
                    "{} nouvelle(s) annonce(s) correspondent à vos critères de recherche",
                    listings.len()
                ),
                android_color: COLOR_GREEN,
                ios_category: "NEW_LISTINGS",
            },
            NotificationEvent::NewMessage {
                sender_name,
                message_preview,
                ..
            } => RenderedTemplate {
                title: format!("💬 Nouveau message de {sender_name}"),
                body: truncate_preview(message_preview),
                android_color: COLOR_BLUE,
                ios_category: "NEW_MESSAGE",
            },
            NotificationEvent::ListingStatusChange {
                listing_title,
                new_status,
                ..
            } => {
                let (title, body, color) = render_status(new_status, listing_title);
                RenderedTemplate {
                    title: title.to_string(),
                    body,
                    android_color: color,
                    ios_category: "LISTING_STATUS",
                }
            }
            NotificationEvent::PaymentReminder {
                payment_type,
                due_date,
                amount,
                ..
            } => {
                let (title, body) = render_payment(payment_type, due_date, *amount);
                RenderedTemplate {
                    title: title.to_string(),
                    body,
                    android_color: COLOR_DEEP_ORANGE,
                    ios_category: "PAYMENT_REMINDER",
                }
            }
        }
    }
}

/// 截断消息预览
///
/// 按字符（而非字节）计数：超过 50 个字符时保留前 50 个并追加 `...`。
pub fn truncate_preview(preview: &str) -> String {
    match preview.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &preview[..cut]),
        None => preview.to_string(),
    }
}

/// 金额的文本形式，整数金额不带小数部分（30 而不是 30.0）
pub fn format_amount(amount: f64) -> String {
    amount.to_string()
}

fn render_status(status: &ListingStatus, listing_title: &str) -> (&'static str, String, &'static str) {
    match status {
        ListingStatus::Approved => (
            "✅ Annonce approuvée !",
            format!(
                "Votre annonce \"{listing_title}\" a été approuvée et est maintenant visible"
            ),
            COLOR_GREEN,
        ),
        ListingStatus::Rejected => (
            "❌ Annonce rejetée",
            format!("Votre annonce \"{listing_title}\" a été rejetée. Consultez les raisons"),
            COLOR_RED,
        ),
        ListingStatus::Sold => (
            "🏠 Annonce vendue !",
            format!("Félicitations ! Votre annonce \"{listing_title}\" a été vendue"),
            COLOR_ORANGE,
        ),
        ListingStatus::Expired => (
            "⏰ Annonce expirée",
            format!("Votre annonce \"{listing_title}\" a expiré. Renouvelez-la si nécessaire"),
            COLOR_DEEP_ORANGE,
        ),
        ListingStatus::Pending | ListingStatus::Other(_) => (
            "📝 Statut modifié",
            format!("Le statut de votre annonce \"{listing_title}\" a changé"),
            COLOR_BLUE_GREY,
        ),
    }
}

fn render_payment(payment_type: &PaymentType, due_date: &str, amount: f64) -> (&'static str, String) {
    let amount = format_amount(amount);
    match payment_type {
        PaymentType::Subscription => (
            "💳 Abonnement à renouveler",
            format!("Votre abonnement premium expire le {due_date}. Renouvelez maintenant !"),
        ),
        PaymentType::ListingFee => (
            "💰 Frais d'annonce à payer",
            format!("Des frais de {amount}€ sont dus pour vos annonces. Payez maintenant !"),
        ),
        PaymentType::PremiumFeatures => (
            "⭐ Fonctionnalités premium",
            format!("Débloquez des fonctionnalités premium pour {amount}€/mois !"),
        ),
        PaymentType::Other(_) => (
            "💳 Paiement requis",
            format!("Un paiement de {amount}€ est requis. Effectuez le paiement maintenant !"),
        ),
    }
}
