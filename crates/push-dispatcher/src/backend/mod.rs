//! 推送后端
//!
//! 通过 `PushBackend` trait 抽象"投递一条消息"这一外部调用。生产环境使用
//! FCM HTTP v1 实现，本地联调使用只记录日志的实现。后端句柄在进程启动时创建一次，
//! 以 `Arc` 注入分发器，供所有分发调用共享。

pub mod auth;
pub mod fcm;
pub mod log;

use std::sync::Arc;

use async_trait::async_trait;
use immo_shared::config::{BackendKind, PushConfig};
use immo_shared::error::SharedError;
use tracing::info;

use crate::error::NotificationError;
use crate::message::PushMessage;

pub use auth::{AccessTokenProvider, ServiceAccountKey};
pub use fcm::FcmBackend;
pub use log::LogOnlyBackend;

/// 推送后端 trait
///
/// 每次调用恰好投递一条消息，不做重试。成功返回后端分配的消息标识，
/// 失败返回带机器可读错误码的 [`NotificationError`]。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushBackend: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError>;

    /// 后端名称，用于日志
    fn name(&self) -> &'static str;
}

/// 按配置创建推送后端
pub async fn from_config(config: &PushConfig) -> Result<Arc<dyn PushBackend>, NotificationError> {
    match config.backend {
        BackendKind::Log => {
            info!(backend = "log", "推送后端仅记录日志，不会触达设备");
            Ok(Arc::new(LogOnlyBackend))
        }
        BackendKind::Fcm => {
            let path = config.require_credentials_path()?;
            let key = ServiceAccountKey::from_file(path).await?;
            let project_id = config
                .project_id
                .clone()
                .or_else(|| key.project_id.clone())
                .ok_or_else(|| SharedError::MissingConfig {
                    key: "push.project_id".to_string(),
                })?;

            let backend = FcmBackend::new(&config.endpoint, &project_id, key, config.validate_only)?;
            info!(
                backend = "fcm",
                project_id = %project_id,
                validate_only = config.validate_only,
                "FCM 推送后端已初始化"
            );
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_log_backend() {
        let backend = from_config(&PushConfig::default()).await.unwrap();
        assert_eq!(backend.name(), "log");
    }

    #[tokio::test]
    async fn test_from_config_fcm_requires_credentials() {
        let config = PushConfig {
            backend: BackendKind::Fcm,
            ..Default::default()
        };
        let err = from_config(&config).await.err().expect("缺少凭据时应报错");
        assert_eq!(err.code(), "MISSING_CONFIG");
    }

    #[tokio::test]
    async fn test_from_config_fcm_missing_file() {
        let config = PushConfig {
            backend: BackendKind::Fcm,
            credentials_path: Some("/nonexistent/service-account.json".to_string()),
            ..Default::default()
        };
        let err = from_config(&config).await.err().expect("凭据文件不存在时应报错");
        assert_eq!(err.code(), "IO_ERROR");
    }
}
