//! 仓储 Trait 定义
//!
//! 事务类操作显式接收事务句柄 `&mut Tx`，仓储对象本身不持有事务状态；
//! 非事务查询接口用于 mock 测试

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    NewRaceResult, RaceResult, RaceTime, RemovedResult, ReplacedResult, Runner, RunnerProfile,
};

/// 事务协调器
///
/// 一次逻辑操作内只开启一个事务，不支持嵌套
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx>;
    async fn commit(&self, tx: Self::Tx) -> Result<()>;
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// 跑者事务存储
#[async_trait]
pub trait RunnerTxStore<Tx: Send>: Send + Sync {
    /// 读取跑者并锁定该行，直到事务结束
    async fn get_runner_for_update(&self, tx: &mut Tx, id: Uuid) -> Result<Option<Runner>>;

    /// 写回聚合字段（历史最佳、赛季最佳）
    async fn update_best_times(&self, tx: &mut Tx, runner: &Runner) -> Result<()>;
}

/// 成绩事务存储
#[async_trait]
pub trait ResultTxStore<Tx: Send>: Send + Sync {
    async fn insert_result(&self, tx: &mut Tx, result: &NewRaceResult) -> Result<RaceResult>;

    /// 修改成绩，返回修改前的用时和年份；未匹配到行时返回 None
    async fn update_result(&self, tx: &mut Tx, result: &RaceResult)
    -> Result<Option<ReplacedResult>>;

    /// 删除成绩，返回删除前的数据；未匹配到行时返回 None
    async fn delete_result(&self, tx: &mut Tx, id: Uuid) -> Result<Option<RemovedResult>>;

    /// 跑者全部成绩中的最小用时
    async fn min_race_time(&self, tx: &mut Tx, runner_id: Uuid) -> Result<Option<RaceTime>>;

    /// 跑者某一年成绩中的最小用时
    async fn min_race_time_in_year(
        &self,
        tx: &mut Tx,
        runner_id: Uuid,
        year: i32,
    ) -> Result<Option<RaceTime>>;
}

/// 跑者仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunnerRepositoryTrait: Send + Sync {
    async fn create_runner(&self, profile: &RunnerProfile) -> Result<Runner>;
    async fn update_runner(&self, id: Uuid, profile: &RunnerProfile) -> Result<u64>;
    async fn deactivate_runner(&self, id: Uuid) -> Result<u64>;
    async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>>;
    async fn list_runners(&self) -> Result<Vec<Runner>>;
    async fn list_top_runners_by_country(&self, country: &str, limit: i64) -> Result<Vec<Runner>>;
    async fn list_top_runners_by_year(&self, year: i32, limit: i64) -> Result<Vec<Runner>>;
    async fn list_runner_ids(&self) -> Result<Vec<Uuid>>;
}

/// 成绩仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultRepositoryTrait: Send + Sync {
    async fn list_results_by_runner(&self, runner_id: Uuid) -> Result<Vec<RaceResult>>;
}
