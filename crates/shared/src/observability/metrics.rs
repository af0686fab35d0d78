//! Prometheus 指标模块
//!
//! 基于 metrics crate 记录推送分发指标。未配置导出端口时 metrics 宏为空操作。

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

pub const PUSH_DISPATCH_TOTAL: &str = "push_dispatch_total";
pub const PUSH_DISPATCH_DURATION_SECONDS: &str = "push_dispatch_duration_seconds";

/// 安装 Prometheus recorder，并在指定端口暴露 `/metrics`
///
/// 必须在 tokio 运行时内调用。
pub fn init(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    register_common_metrics();
    Ok(())
}

fn register_common_metrics() {
    metrics::describe_counter!(
        PUSH_DISPATCH_TOTAL,
        "Total number of push dispatch attempts by event and outcome"
    );
    metrics::describe_histogram!(
        PUSH_DISPATCH_DURATION_SECONDS,
        "Push backend call duration in seconds"
    );
}

/// 记录一次分发结果
///
/// `outcome` 取值：success / skipped / error
pub fn record_dispatch(event: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(PUSH_DISPATCH_TOTAL, "event" => event, "outcome" => outcome).increment(1);
    metrics::histogram!(PUSH_DISPATCH_DURATION_SECONDS, "event" => event)
        .record(elapsed.as_secs_f64());
}
