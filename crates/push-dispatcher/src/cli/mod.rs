//! CLI 模块
//!
//! - `run` - 回放事件文件，逐条（或并发）分发给目录中的收件人或主题
//! - `send` - 向设备或主题发送一条自定义通知
//!
//! # 使用示例
//!
//! ```bash
//! # 按目录中的收件人回放事件，每条之间暂停 500ms
//! immo-push --directory directory.json run -f events.json --pause-ms 500
//!
//! # 以各事件的默认主题广播，并发发送
//! immo-push run -f events.json --broadcast --concurrent
//!
//! # 发送自定义通知
//! immo-push send --topic all_users --title "Maintenance" --body "Ce soir 22h" --data reason=upgrade
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands, RunArgs, SendArgs};
pub use runner::{CommandRunner, RunOptions, RunSummary};
