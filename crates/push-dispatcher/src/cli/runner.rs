//! 命令执行器
//!
//! 把 CLI 参数转化为通知服务调用。回放事件时单条失败只记录日志并计入汇总，
//! 发送单条自定义通知时失败直接返回错误。

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::future::join_all;
use immo_shared::events::{DeliveryTarget, NotificationEvent, Topic};
use tracing::{error, info, warn};

use crate::dispatcher::DispatchResult;
use crate::error::NotificationError;
use crate::payload::CustomNotification;
use crate::service::{DeliveryReport, NotificationService, RecipientOutcome};

/// 回放选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub broadcast: bool,
    /// 广播主题，缺省时使用事件的默认主题
    pub topic: Option<Topic>,
    pub concurrent: bool,
    pub pause: Duration,
}

/// 回放汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub events: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl RunSummary {
    fn record(&mut self, event: &NotificationEvent, outcome: Result<DeliveryReport, NotificationError>) {
        match outcome {
            Ok(report) => {
                self.sent += report.sent_count();
                self.skipped += report.skipped_count();
            }
            Err(e) => {
                error!(event = event.type_name(), code = e.code(), error = %e, "事件分发失败，继续下一条");
                self.failed += 1;
                self.errors.push(format!("{}: {e}", event.type_name()));
            }
        }
    }

    pub fn is_all_success(&self) -> bool {
        self.failed == 0
    }

    pub fn print(&self) {
        println!("\n推送回放结果:");
        println!("{}", "-".repeat(40));
        println!("事件数量: {}", self.events);
        println!("发送成功: {}", self.sent);
        println!("无 token 跳过: {}", self.skipped);
        println!("发送失败: {}", self.failed);
        println!("执行耗时: {} ms", self.duration_ms);
        println!("{}", "-".repeat(40));
    }
}

/// 命令执行器
pub struct CommandRunner {
    service: NotificationService,
}

impl CommandRunner {
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }

    /// 执行 run 命令
    pub async fn run_events(&self, file: &str, options: &RunOptions) -> Result<RunSummary> {
        let events = load_events(file).await?;
        info!(
            file,
            events = events.len(),
            broadcast = options.broadcast,
            concurrent = options.concurrent,
            "开始回放事件"
        );
        Ok(self.replay(&events, options).await)
    }

    /// 分发一组事件并汇总结果
    pub async fn replay(&self, events: &[NotificationEvent], options: &RunOptions) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary {
            events: events.len(),
            ..Default::default()
        };

        if options.concurrent {
            let outcomes = join_all(events.iter().map(|event| self.process(event, options))).await;
            for (event, outcome) in events.iter().zip(outcomes) {
                summary.record(event, outcome);
            }
        } else {
            for (index, event) in events.iter().enumerate() {
                if index > 0 && !options.pause.is_zero() {
                    tokio::time::sleep(options.pause).await;
                }
                let outcome = self.process(event, options).await;
                summary.record(event, outcome);
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        if !summary.is_all_success() {
            warn!(failed = summary.failed, events = summary.events, "部分事件分发失败");
        }
        summary
    }

    /// 执行 send 命令
    pub async fn run_send(
        &self,
        target: &DeliveryTarget,
        notification: &CustomNotification,
    ) -> Result<DispatchResult> {
        let result = self
            .service
            .dispatcher()
            .dispatch_custom(notification, target)
            .await
            .with_context(|| format!("发送自定义通知失败: {}", target.describe()))?;

        if let Some(message_id) = result.message_id() {
            println!("✅ 通知已发送: {message_id}");
        }
        Ok(result)
    }

    async fn process(
        &self,
        event: &NotificationEvent,
        options: &RunOptions,
    ) -> Result<DeliveryReport, NotificationError> {
        if options.broadcast {
            let topic = options.topic.unwrap_or_else(|| event.default_topic());
            let result = self.service.broadcast(event, Some(topic)).await?;
            return Ok(DeliveryReport {
                outcomes: vec![RecipientOutcome {
                    user_id: format!("topic:{topic}"),
                    result,
                }],
            });
        }
        self.service.notify_event(event).await
    }
}

/// 从 JSON 文件加载事件数组
pub async fn load_events(path: impl AsRef<Path>) -> Result<Vec<NotificationEvent>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取事件文件失败: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("解析事件文件失败: {}", path.display()))
}
