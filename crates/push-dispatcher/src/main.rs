//! 推送通知命令行入口

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use immo_shared::config::AppConfig;
use immo_shared::observability;
use tracing::{info, warn};

use push_dispatcher::backend;
use push_dispatcher::cli::{Cli, CommandRunner, Commands};
use push_dispatcher::directory::InMemoryDirectory;
use push_dispatcher::{Dispatcher, NotificationService};

const SERVICE_NAME: &str = "immo-push";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    observability::init(&config.observability, SERVICE_NAME)?;
    config.validate().context("配置校验失败")?;

    let backend = backend::from_config(&config.push)
        .await
        .context("初始化推送后端失败")?;

    // 命令行参数优先于配置文件
    let directory = match cli.directory.or(config.directory.fixture_path) {
        Some(path) => {
            let directory = InMemoryDirectory::from_file(&path)
                .await
                .context("加载目录文件失败")?;
            info!(path = %path, users = directory.user_count(), "目录已加载");
            directory
        }
        None => {
            warn!("未配置目录文件，所有收件人都将被跳过");
            InMemoryDirectory::new()
        }
    };
    let directory = Arc::new(directory);

    let service = NotificationService::new(
        directory.clone(),
        directory,
        Dispatcher::new(backend),
    );
    let runner = CommandRunner::new(service);

    match cli.command {
        Commands::Run(args) => {
            let options = args.options()?;
            let summary = runner.run_events(&args.file, &options).await?;
            summary.print();
        }
        Commands::Send(args) => {
            let target = args.target()?;
            runner.run_send(&target, &args.notification()).await?;
        }
    }

    Ok(())
}
