//! 共享库
//!
//! 包含推送服务共用的配置、错误处理、通知事件定义与可观测性基础设施代码。

pub mod config;
pub mod error;
pub mod events;
pub mod observability;
