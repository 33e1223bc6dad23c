//! 跑者管理服务
//!
//! 跑者档案的增删改查和排行查询，不涉及最佳成绩的维护

use std::sync::Arc;

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use runners_shared::config::AppConfig;

use crate::error::{Result, RunnerError};
use crate::models::Runner;
use crate::repository::{
    ResultRepository, ResultRepositoryTrait, RunnerRepository, RunnerRepositoryTrait,
};
use crate::service::dto::{RunnerFilter, RunnerQuery, RunnerRequest, UpdateRunnerRequest};
use crate::validation::{
    TOP_RUNNERS_LIMIT, parse_runner_filter, parse_runner_request, validate_runner_id,
};

/// 跑者管理服务
pub struct RunnerService<RR = RunnerRepository, ER = ResultRepository>
where
    RR: RunnerRepositoryTrait,
    ER: ResultRepositoryTrait,
{
    runner_repo: Arc<RR>,
    result_repo: Arc<ER>,
    season_year: Option<i32>,
}

impl RunnerService {
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(RunnerRepository::new(pool.clone())),
            Arc::new(ResultRepository::new(pool)),
        )
        .with_season_year(config.season.fixed_year)
    }
}

impl<RR, ER> RunnerService<RR, ER>
where
    RR: RunnerRepositoryTrait,
    ER: ResultRepositoryTrait,
{
    pub fn new(runner_repo: Arc<RR>, result_repo: Arc<ER>) -> Self {
        Self {
            runner_repo,
            result_repo,
            season_year: None,
        }
    }

    pub fn with_season_year(mut self, year: Option<i32>) -> Self {
        self.season_year = year;
        self
    }

    fn current_year(&self) -> i32 {
        self.season_year.unwrap_or_else(|| Utc::now().year())
    }

    /// 创建跑者，返回带存储分配 ID 的跑者
    #[instrument(skip(self, request))]
    pub async fn create_runner(&self, request: &RunnerRequest) -> Result<Runner> {
        let profile = parse_runner_request(request)?;
        let runner = self.runner_repo.create_runner(&profile).await?;

        info!(runner_id = %runner.id, name = %runner.full_name(), "跑者创建成功");
        Ok(runner)
    }

    /// 修改跑者档案
    #[instrument(skip(self, request), fields(runner_id = %request.id))]
    pub async fn update_runner(&self, request: &UpdateRunnerRequest) -> Result<()> {
        let id = validate_runner_id(&request.id)?;
        let profile = parse_runner_request(&request.profile)?;

        if self.runner_repo.update_runner(id, &profile).await? == 0 {
            return Err(RunnerError::RunnerNotFound(id));
        }
        Ok(())
    }

    /// 逻辑删除跑者
    #[instrument(skip(self))]
    pub async fn delete_runner(&self, runner_id: &str) -> Result<()> {
        let id = validate_runner_id(runner_id)?;

        if self.runner_repo.deactivate_runner(id).await? == 0 {
            return Err(RunnerError::RunnerNotFound(id));
        }
        info!(%id, "跑者已停用");
        Ok(())
    }

    /// 获取跑者及其全部成绩
    #[instrument(skip(self))]
    pub async fn get_runner(&self, runner_id: &str) -> Result<Runner> {
        let id = validate_runner_id(runner_id)?;

        let mut runner = self
            .runner_repo
            .get_runner(id)
            .await?
            .ok_or(RunnerError::RunnerNotFound(id))?;
        runner.results = self.result_repo.list_results_by_runner(id).await?;

        Ok(runner)
    }

    /// 按过滤条件列出跑者
    #[instrument(skip(self))]
    pub async fn list_runners(&self, filter: &RunnerFilter) -> Result<Vec<Runner>> {
        match parse_runner_filter(filter, self.current_year())? {
            RunnerQuery::All => self.runner_repo.list_runners().await,
            RunnerQuery::TopByCountry(country) => {
                self.runner_repo
                    .list_top_runners_by_country(&country, TOP_RUNNERS_LIMIT)
                    .await
            }
            RunnerQuery::TopByYear(year) => {
                self.runner_repo
                    .list_top_runners_by_year(year, TOP_RUNNERS_LIMIT)
                    .await
            }
        }
    }
}
