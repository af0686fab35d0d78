//! 统一可观测性模块
//!
//! 提供日志与指标的统一初始化，所有入口通过单一函数配置可观测性。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（仅在配置了端口时启用 Prometheus 导出）
pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<()> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        log_level = %config.log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    if let Some(port) = config.metrics_port {
        metrics::init(port)?;
    }

    Ok(())
}
