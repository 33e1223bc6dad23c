//! 跑者服务运维入口

use anyhow::{Context, Result, bail};
use clap::Parser;

use runners::SERVICE_NAME;
use runners::cli::{Cli, CommandRunner, Commands};
use runners_shared::config::AppConfig;
use runners_shared::database::Database;
use runners_shared::observability;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 文件不存在时忽略
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    observability::init_logging(&config.logging)?;

    tracing::info!(
        environment = %config.environment,
        isolation = config.database.isolation_level.as_sql(),
        "runners-admin 启动"
    );

    let database = Database::connect(&config.database).await?;
    let runner = CommandRunner::new(database, config);

    let outcome = match cli.command {
        Commands::Migrate => runner.run_migrate().await,
        Commands::Check => runner.run_check().await,
        Commands::Recompute(args) => match args.runner {
            Some(runner_id) => runner.run_recompute_runner(&runner_id).await,
            None => runner.run_recompute_all().await.and_then(|summary| {
                if summary.failed > 0 {
                    bail!("{} / {} 个跑者重算失败", summary.failed, summary.total);
                }
                Ok(())
            }),
        },
    };

    runner.close().await;
    outcome
}
