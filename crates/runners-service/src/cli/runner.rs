//! 命令执行器

use anyhow::{Context, Result};
use tracing::{error, info};

use runners_shared::config::AppConfig;
use runners_shared::database::Database;

use crate::MIGRATOR;
use crate::repository::RunnerRepository;
use crate::service::PgResultService;

/// 命令执行器
pub struct CommandRunner {
    database: Database,
    config: AppConfig,
}

/// 批量重算的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeSummary {
    pub total: usize,
    pub failed: usize,
}

impl CommandRunner {
    pub fn new(database: Database, config: AppConfig) -> Self {
        Self { database, config }
    }

    pub async fn run_migrate(&self) -> Result<()> {
        self.database
            .run_migrations(&MIGRATOR)
            .await
            .context("数据库迁移失败")
    }

    pub async fn run_check(&self) -> Result<()> {
        self.database
            .health_check()
            .await
            .context("数据库健康检查失败")?;
        info!("数据库连接正常");
        Ok(())
    }

    /// 重算单个跑者
    pub async fn run_recompute_runner(&self, runner_id: &str) -> Result<()> {
        let service = self.result_service();
        let runner = service
            .recompute_best_times(runner_id)
            .await
            .with_context(|| format!("重算跑者 {} 失败", runner_id))?;

        info!(
            runner_id = %runner.id,
            personal_best = ?runner.personal_best.map(|t| t.to_string()),
            season_best = ?runner.season_best.map(|t| t.to_string()),
            "最佳成绩已重算"
        );
        Ok(())
    }

    /// 重算全部跑者，单个失败不影响其他跑者
    pub async fn run_recompute_all(&self) -> Result<RecomputeSummary> {
        let service = self.result_service();
        let ids = RunnerRepository::new(self.database.pool().clone())
            .list_runner_ids()
            .await
            .context("读取跑者列表失败")?;

        let mut summary = RecomputeSummary {
            total: ids.len(),
            failed: 0,
        };
        for id in ids {
            if let Err(e) = service.recompute_best_times(&id.to_string()).await {
                summary.failed += 1;
                error!(runner_id = %id, error = %e, "重算失败");
            }
        }

        info!(total = summary.total, failed = summary.failed, "批量重算完成");
        Ok(summary)
    }

    pub async fn close(&self) {
        self.database.close().await;
    }

    fn result_service(&self) -> PgResultService {
        PgResultService::from_config(self.database.pool().clone(), &self.config)
    }
}
