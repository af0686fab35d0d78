//! 统一错误处理模块
//!
//! 定义配置加载、目录数据读取等基础设施场景共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 共享基础设施错误类型
#[derive(Debug, Error)]
pub enum SharedError {
    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("缺少必要配置: {key}")]
    MissingConfig { key: String },

    // ==================== 文件与数据错误 ====================
    #[error("文件读取失败: {path} - {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("数据解析失败: {path} - {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // ==================== 验证错误 ====================
    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, SharedError>;

impl SharedError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::MissingConfig { .. } => "MISSING_CONFIG",
            Self::Io { .. } => "IO_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
    }
}
