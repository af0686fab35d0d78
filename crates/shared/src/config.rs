//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::SharedError;

/// 推送后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Firebase Cloud Messaging HTTP v1
    Fcm,
    /// 仅记录日志，不触达外部服务，用于本地联调
    #[default]
    Log,
}

/// 推送后端配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub backend: BackendKind,
    /// Firebase 项目 ID，缺省时取服务账号文件中的 project_id
    pub project_id: Option<String>,
    /// 服务账号 JSON 文件路径
    pub credentials_path: Option<String>,
    pub endpoint: String,
    /// 只让 FCM 校验消息而不真正投递
    pub validate_only: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            project_id: None,
            credentials_path: None,
            endpoint: "https://fcm.googleapis.com".to_string(),
            validate_only: false,
        }
    }
}

impl PushConfig {
    /// FCM 后端必须配置服务账号文件
    pub fn require_credentials_path(&self) -> Result<&str, SharedError> {
        self.credentials_path
            .as_deref()
            .ok_or_else(|| SharedError::MissingConfig {
                key: "push.credentials_path".to_string(),
            })
    }
}

/// 用户与房源目录配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DirectoryConfig {
    /// 目录数据文件（JSON），为空时目录为空
    pub fixture_path: Option<String>,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    /// 配置后在该端口暴露 Prometheus 指标
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub push: PushConfig,
    pub directory: DirectoryConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. .env 文件（仅补充进程环境变量）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. 环境变量（IMMO_ 前缀，双下划线分隔层级，如 IMMO_PUSH__PROJECT_ID -> push.project_id）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        // .env 不存在是常态
        let _ = dotenvy::dotenv();

        let env = std::env::var("IMMO_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    /// 从指定目录加载配置，环境变量覆盖规则与 [`AppConfig::load`] 相同
    pub fn load_from(
        config_dir: &Path,
        environment: &str,
        service_name: &str,
    ) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", environment)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{environment}.toml"))).required(false),
            )
            .add_source(
                Environment::with_prefix("IMMO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 启动前校验：生产环境不允许只记录日志的推送后端
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.is_production() && self.push.backend == BackendKind::Log {
            return Err(SharedError::InvalidArgument {
                field: "push.backend".to_string(),
                message: "生产环境必须使用 fcm 后端".to_string(),
            });
        }
        Ok(())
    }
}
