//! 成绩生命周期服务
//!
//! 成绩的创建、修改、删除与跑者最佳成绩的重算在同一事务内完成。
//!
//! ## 处理流程
//!
//! 1. Validating：结构校验、ID 校验、用时解析（不触碰存储）
//! 2. Persisting：开启事务后写入成绩变更（创建成绩时先锁定跑者行）
//! 3. Aggregating：锁定跑者行，重算并写回最佳成绩
//! 4. Committing：提交事务
//!
//! 开启事务后任一步骤失败都会先回滚再返回原始错误，
//! 回滚自身失败只记录日志。

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use runners_shared::config::AppConfig;

use crate::aggregate;
use crate::error::{Result, RunnerError};
use crate::models::{NewRaceResult, RaceResult, RemovedResult, Runner};
use crate::repository::{
    PgTransactionCoordinator, ResultRepository, ResultTxStore, RunnerRepository, RunnerTxStore,
    TransactionCoordinator,
};
use crate::service::dto::{ResultRequest, UpdateResultRequest};
use crate::validation::{parse_result_request, validate_result_id, validate_runner_id};

/// 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Validating,
    Persisting,
    Aggregating,
    Committing,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Persisting => "persisting",
            Self::Aggregating => "aggregating",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// 单次逻辑操作的阶段跟踪
#[derive(Debug)]
struct Lifecycle {
    operation: &'static str,
    stage: LifecycleStage,
}

impl Lifecycle {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            stage: LifecycleStage::Validating,
        }
    }

    fn advance(&mut self, next: LifecycleStage) {
        debug!(operation = self.operation, from = %self.stage, to = %next, "阶段切换");
        self.stage = next;
    }

    /// 事务开始前的失败
    fn reject(&self, err: RunnerError) -> RunnerError {
        debug!(operation = self.operation, stage = %self.stage, error = %err, "请求被拒绝");
        err
    }
}

/// 成绩生命周期服务
pub struct ResultService<C, RS, ES>
where
    C: TransactionCoordinator,
    RS: RunnerTxStore<C::Tx>,
    ES: ResultTxStore<C::Tx>,
{
    coordinator: Arc<C>,
    runners: Arc<RS>,
    results: Arc<ES>,
    /// 固定赛季年份，为空时取 UTC 当前年份
    season_year: Option<i32>,
}

/// PostgreSQL 实现的成绩服务
pub type PgResultService = ResultService<PgTransactionCoordinator, RunnerRepository, ResultRepository>;

impl PgResultService {
    /// 按应用配置（隔离级别、赛季）组装服务
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Self {
        let coordinator = PgTransactionCoordinator::new(pool.clone(), config.database.isolation_level);
        Self::new(
            Arc::new(coordinator),
            Arc::new(RunnerRepository::new(pool.clone())),
            Arc::new(ResultRepository::new(pool)),
        )
        .with_season_year(config.season.fixed_year)
    }
}

impl<C, RS, ES> ResultService<C, RS, ES>
where
    C: TransactionCoordinator,
    RS: RunnerTxStore<C::Tx>,
    ES: ResultTxStore<C::Tx>,
{
    pub fn new(coordinator: Arc<C>, runners: Arc<RS>, results: Arc<ES>) -> Self {
        Self {
            coordinator,
            runners,
            results,
            season_year: None,
        }
    }

    /// 固定赛季年份
    pub fn with_season_year(mut self, year: Option<i32>) -> Self {
        self.season_year = year;
        self
    }

    pub fn current_year(&self) -> i32 {
        self.season_year.unwrap_or_else(|| Utc::now().year())
    }

    /// 创建成绩
    #[instrument(skip(self, request), fields(runner_id = %request.runner_id))]
    pub async fn create_result(&self, request: &ResultRequest) -> Result<RaceResult> {
        let mut lifecycle = Lifecycle::new("create_result");
        let current_year = self.current_year();

        let new_result =
            parse_result_request(request, current_year).map_err(|e| lifecycle.reject(e))?;

        let mut tx = self.coordinator.begin().await?;
        let outcome = self
            .create_in_tx(&mut tx, &new_result, current_year, &mut lifecycle)
            .await;
        let result = self.finish(tx, outcome, &mut lifecycle).await?;

        info!(result_id = %result.id, race_result = %result.race_result, "成绩创建成功");
        Ok(result)
    }

    /// 修改成绩
    ///
    /// 成绩归属不可变更；ID 未匹配到该跑者名下的成绩时返回 ResultNotFound
    #[instrument(skip(self, request), fields(result_id = %request.id, runner_id = %request.result.runner_id))]
    pub async fn update_result(&self, request: &UpdateResultRequest) -> Result<RaceResult> {
        let mut lifecycle = Lifecycle::new("update_result");
        let current_year = self.current_year();

        let id = validate_result_id(&request.id).map_err(|e| lifecycle.reject(e))?;
        let updated = parse_result_request(&request.result, current_year)
            .map_err(|e| lifecycle.reject(e))?
            .into_result(id);

        let mut tx = self.coordinator.begin().await?;
        let outcome = self
            .update_in_tx(&mut tx, &updated, current_year, &mut lifecycle)
            .await;
        let result = self.finish(tx, outcome, &mut lifecycle).await?;

        info!(race_result = %result.race_result, "成绩修改成功");
        Ok(result)
    }

    /// 删除成绩，返回删除前的数据
    #[instrument(skip(self))]
    pub async fn delete_result(&self, result_id: &str) -> Result<RemovedResult> {
        let mut lifecycle = Lifecycle::new("delete_result");
        let current_year = self.current_year();

        let id = validate_result_id(result_id).map_err(|e| lifecycle.reject(e))?;

        let mut tx = self.coordinator.begin().await?;
        let outcome = self
            .delete_in_tx(&mut tx, id, current_year, &mut lifecycle)
            .await;
        let removed = self.finish(tx, outcome, &mut lifecycle).await?;

        info!(runner_id = %removed.runner_id, "成绩删除成功");
        Ok(removed)
    }

    /// 从存储中重新推导跑者的最佳成绩
    ///
    /// 对未变化的成绩集合重复执行结果不变
    #[instrument(skip(self))]
    pub async fn recompute_best_times(&self, runner_id: &str) -> Result<Runner> {
        let mut lifecycle = Lifecycle::new("recompute_best_times");
        let current_year = self.current_year();

        let runner_id = validate_runner_id(runner_id).map_err(|e| lifecycle.reject(e))?;

        let mut tx = self.coordinator.begin().await?;
        let outcome = self
            .recompute_in_tx(&mut tx, runner_id, current_year, &mut lifecycle)
            .await;
        self.finish(tx, outcome, &mut lifecycle).await
    }

    // ==================== 事务内步骤 ====================

    async fn create_in_tx(
        &self,
        tx: &mut C::Tx,
        new_result: &NewRaceResult,
        current_year: i32,
        lifecycle: &mut Lifecycle,
    ) -> Result<RaceResult> {
        // 跑者行锁必须先于插入获取，插入的外键检查会先持有该行的 KEY SHARE 锁
        let mut runner = self.lock_runner(tx, new_result.runner_id).await?;

        lifecycle.advance(LifecycleStage::Persisting);
        let result = self.results.insert_result(tx, new_result).await?;

        lifecycle.advance(LifecycleStage::Aggregating);
        aggregate::apply_result(&mut runner, result.race_result, result.year, current_year);
        self.runners.update_best_times(tx, &runner).await?;

        Ok(result)
    }

    async fn update_in_tx(
        &self,
        tx: &mut C::Tx,
        updated: &RaceResult,
        current_year: i32,
        lifecycle: &mut Lifecycle,
    ) -> Result<RaceResult> {
        lifecycle.advance(LifecycleStage::Persisting);
        let replaced = self
            .results
            .update_result(tx, updated)
            .await?
            .ok_or(RunnerError::ResultNotFound(updated.id))?;

        lifecycle.advance(LifecycleStage::Aggregating);
        let mut runner = self.lock_runner(tx, replaced.runner_id).await?;

        // 旧值若为最佳成绩，先按删除路径重算，再按新增路径应用新值
        let removed = replaced.as_removed(updated.id);
        aggregate::reconcile_after_removal(
            self.results.as_ref(),
            tx,
            &mut runner,
            &removed,
            current_year,
        )
        .await?;
        aggregate::apply_result(&mut runner, updated.race_result, updated.year, current_year);
        self.runners.update_best_times(tx, &runner).await?;

        Ok(updated.clone())
    }

    async fn delete_in_tx(
        &self,
        tx: &mut C::Tx,
        id: Uuid,
        current_year: i32,
        lifecycle: &mut Lifecycle,
    ) -> Result<RemovedResult> {
        lifecycle.advance(LifecycleStage::Persisting);
        let removed = self
            .results
            .delete_result(tx, id)
            .await?
            .ok_or(RunnerError::ResultNotFound(id))?;

        lifecycle.advance(LifecycleStage::Aggregating);
        let mut runner = self.lock_runner(tx, removed.runner_id).await?;
        let change = aggregate::reconcile_after_removal(
            self.results.as_ref(),
            tx,
            &mut runner,
            &removed,
            current_year,
        )
        .await?;
        debug!(
            personal_best_changed = change.personal_best,
            season_best_changed = change.season_best,
            "删除后重算最佳成绩"
        );
        self.runners.update_best_times(tx, &runner).await?;

        Ok(removed)
    }

    async fn recompute_in_tx(
        &self,
        tx: &mut C::Tx,
        runner_id: Uuid,
        current_year: i32,
        lifecycle: &mut Lifecycle,
    ) -> Result<Runner> {
        lifecycle.advance(LifecycleStage::Aggregating);
        let mut runner = self.lock_runner(tx, runner_id).await?;
        let change =
            aggregate::recompute_from_store(self.results.as_ref(), tx, &mut runner, current_year)
                .await?;
        if change.any() {
            info!(%runner_id, "最佳成绩与成绩记录不一致，已修正");
        }
        self.runners.update_best_times(tx, &runner).await?;

        Ok(runner)
    }

    async fn lock_runner(&self, tx: &mut C::Tx, runner_id: Uuid) -> Result<Runner> {
        self.runners
            .get_runner_for_update(tx, runner_id)
            .await?
            .ok_or(RunnerError::RunnerNotFound(runner_id))
    }

    /// 根据事务内步骤的结果提交或回滚
    async fn finish<T>(
        &self,
        tx: C::Tx,
        outcome: Result<T>,
        lifecycle: &mut Lifecycle,
    ) -> Result<T> {
        match outcome {
            Ok(value) => {
                lifecycle.advance(LifecycleStage::Committing);
                if let Err(e) = self.coordinator.commit(tx).await {
                    warn!(operation = lifecycle.operation, stage = %lifecycle.stage, error = %e, "事务提交失败");
                    return Err(e);
                }
                Ok(value)
            }
            Err(e) => {
                warn!(operation = lifecycle.operation, stage = %lifecycle.stage, error = %e, "操作失败，回滚事务");
                if let Err(rollback_err) = self.coordinator.rollback(tx).await {
                    error!(operation = lifecycle.operation, error = %rollback_err, "事务回滚失败");
                }
                Err(e)
            }
        }
    }
}
