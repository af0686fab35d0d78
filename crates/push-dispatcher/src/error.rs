//! 推送服务错误类型
//!
//! 区分推送后端拒绝、网络传输失败、凭据问题与房源缺失等场景，
//! 便于调用方决定记录后继续还是中止。收件人缺少设备 token 不属于错误，
//! 由 [`crate::dispatcher::DispatchResult::Failure`] 表达。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("推送后端拒绝消息: 错误码={code}, 原因={reason}")]
    Backend { code: String, reason: String },

    #[error("推送后端请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("推送凭据无效: {0}")]
    Credentials(String),

    #[error("推送数据编码失败: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("房源未找到: {listing_id}")]
    ListingNotFound { listing_id: String },

    #[error(transparent)]
    Shared(#[from] immo_shared::error::SharedError),
}

impl NotificationError {
    /// 机器可读的错误码；后端错误直接返回后端给出的错误码
    pub fn code(&self) -> &str {
        match self {
            Self::Backend { code, .. } => code,
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Credentials(_) => "INVALID_CREDENTIALS",
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::ListingNotFound { .. } => "LISTING_NOT_FOUND",
            Self::Shared(e) => e.code(),
        }
    }
}
