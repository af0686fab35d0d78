//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use immo_shared::error::SharedError;
use immo_shared::events::{DeliveryTarget, Topic};
use serde_json::json;

use super::runner::RunOptions;
use crate::payload::{CustomNotification, DataPayload};

/// 房产应用推送通知命令行工具
#[derive(Parser, Debug)]
#[command(name = "immo-push")]
#[command(version, about = "房产应用推送通知分发工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 用户与房源目录文件（覆盖配置中的 directory.fixture_path）
    #[arg(short, long, global = true)]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 回放事件文件
    ///
    /// 文件内容为事件数组，每个事件以 `type` 字段区分类型。
    /// 单条失败只记录日志，不影响后续事件。
    Run(RunArgs),

    /// 发送一条自定义通知
    Send(SendArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 事件文件路径（JSON）
    #[arg(short, long)]
    pub file: String,

    /// 向主题广播，而不是发给目录中的收件人
    #[arg(long)]
    pub broadcast: bool,

    /// 广播主题，缺省时使用各事件的默认主题
    #[arg(long, requires = "broadcast")]
    pub topic: Option<String>,

    /// 并发发送所有事件并等待全部完成
    #[arg(long, conflicts_with = "pause_ms")]
    pub concurrent: bool,

    /// 顺序发送时相邻两条事件之间的暂停（毫秒）
    #[arg(long)]
    pub pause_ms: Option<u64>,
}

impl RunArgs {
    pub fn options(&self) -> Result<RunOptions, SharedError> {
        let topic = self.topic.as_deref().map(str::parse::<Topic>).transpose()?;

        Ok(RunOptions {
            broadcast: self.broadcast,
            topic,
            concurrent: self.concurrent,
            pause: Duration::from_millis(self.pause_ms.unwrap_or(0)),
        })
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// 设备推送 token
    #[arg(long, required_unless_present = "topic", conflicts_with = "topic")]
    pub token: Option<String>,

    /// 主题名称
    #[arg(long)]
    pub topic: Option<String>,

    /// 通知标题
    #[arg(long)]
    pub title: String,

    /// 通知正文
    #[arg(long)]
    pub body: String,

    /// 附加数据（key=value，可重复）
    #[arg(long = "data", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// 点击后跳转的页面
    #[arg(long)]
    pub screen: Option<String>,
}

impl SendArgs {
    pub fn target(&self) -> Result<DeliveryTarget, SharedError> {
        match (&self.token, &self.topic) {
            (Some(token), _) => Ok(DeliveryTarget::Device(token.clone())),
            (None, Some(topic)) => Ok(DeliveryTarget::Topic(topic.parse()?)),
            (None, None) => Err(SharedError::InvalidArgument {
                field: "target".to_string(),
                message: "需要 --token 或 --topic".to_string(),
            }),
        }
    }

    pub fn notification(&self) -> CustomNotification {
        let data: DataPayload = self.data.iter().cloned().collect();
        // 指定了跳转页面时附带空参数对象，客户端统一按 params 解析
        let params = self.screen.as_ref().map(|_| json!({}));

        CustomNotification {
            title: self.title.clone(),
            body: self.body.clone(),
            data,
            screen: self.screen.clone(),
            params,
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("无效的数据项 '{raw}'，预期格式: key=value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["immo-push", "run", "-f", "events.json"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.file, "events.json");
                let options = args.options().unwrap();
                assert!(!options.broadcast);
                assert!(!options.concurrent);
                assert_eq!(options.pause, Duration::ZERO);
                assert!(options.topic.is_none());
            }
            _ => panic!("预期 Run 命令"),
        }

        let cli = Cli::parse_from([
            "immo-push",
            "--directory",
            "directory.json",
            "run",
            "--file",
            "events.json",
            "--broadcast",
            "--topic",
            "buyers",
            "--pause-ms",
            "250",
        ]);
        assert_eq!(cli.directory.as_deref(), Some("directory.json"));
        match cli.command {
            Commands::Run(args) => {
                let options = args.options().unwrap();
                assert!(options.broadcast);
                assert_eq!(options.topic, Some(Topic::Buyers));
                assert_eq!(options.pause, Duration::from_millis(250));
            }
            _ => panic!("预期 Run 命令"),
        }
    }

    #[test]
    fn test_cli_run_rejects_concurrent_with_pause() {
        let result = Cli::try_parse_from([
            "immo-push",
            "run",
            "-f",
            "events.json",
            "--concurrent",
            "--pause-ms",
            "100",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_run_unknown_topic() {
        let cli = Cli::parse_from([
            "immo-push",
            "run",
            "-f",
            "events.json",
            "--broadcast",
            "--topic",
            "sellers",
        ]);
        match cli.command {
            Commands::Run(args) => {
                let err = args.options().unwrap_err();
                assert_eq!(err.code(), "INVALID_ARGUMENT");
            }
            _ => panic!("预期 Run 命令"),
        }
    }

    #[test]
    fn test_cli_parse_send_to_token() {
        let cli = Cli::parse_from([
            "immo-push",
            "send",
            "--token",
            "fcm_token_123",
            "--title",
            "🏠 Test",
            "--body",
            "Ceci est un test",
            "--data",
            "listingId=listing_1",
            "--data",
            "source=cli",
            "--screen",
            "listing_detail",
        ]);
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(
                    args.target().unwrap(),
                    DeliveryTarget::Device("fcm_token_123".to_string())
                );
                let notification = args.notification();
                assert_eq!(notification.data.len(), 2);
                assert_eq!(
                    notification.data.get("listingId").map(String::as_str),
                    Some("listing_1")
                );
                assert_eq!(notification.screen.as_deref(), Some("listing_detail"));
                assert_eq!(notification.params, Some(json!({})));
            }
            _ => panic!("预期 Send 命令"),
        }
    }

    #[test]
    fn test_cli_parse_send_to_topic() {
        let cli = Cli::parse_from([
            "immo-push", "send", "--topic", "all_users", "--title", "T", "--body", "B",
        ]);
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.target().unwrap(), DeliveryTarget::Topic(Topic::AllUsers));
                assert!(args.notification().params.is_none());
            }
            _ => panic!("预期 Send 命令"),
        }
    }

    #[test]
    fn test_cli_send_requires_exactly_one_target() {
        let missing = Cli::try_parse_from(["immo-push", "send", "--title", "T", "--body", "B"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "immo-push", "send", "--token", "t", "--topic", "owners", "--title", "T", "--body", "B",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_key_value("empty=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
