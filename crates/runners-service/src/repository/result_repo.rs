//! 成绩仓储
//!
//! 成绩的增删改都在调用方提供的事务内执行，
//! 修改和删除通过 RETURNING 一并取回变更前的数据

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::{ResultRepositoryTrait, ResultTxStore};
use super::transaction::PgTx;
use crate::error::{Result, RunnerError};
use crate::models::{
    NewRaceResult, RaceResult, RaceResultRow, RaceTime, RemovedResult, RemovedResultRow,
    ReplacedResult, ReplacedResultRow, parse_stored,
};

/// 成绩仓储
pub struct ResultRepository {
    pool: PgPool,
}

impl ResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 列出跑者的全部成绩
    pub async fn list_results_by_runner(&self, runner_id: Uuid) -> Result<Vec<RaceResult>> {
        let rows = sqlx::query_as::<_, RaceResultRow>(
            r#"
            SELECT id, runner_id, race_result, location, position, year
            FROM results
            WHERE runner_id = $1
            ORDER BY year DESC, race_result
            "#,
        )
        .bind(runner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RaceResult::try_from).collect()
    }

    // ==================== 事务操作 ====================

    /// 在事务中写入成绩
    ///
    /// 跑者不存在时外键约束失败，归类为 RunnerNotFound
    pub async fn insert_result_in_tx(
        tx: &mut PgConnection,
        result: &NewRaceResult,
    ) -> Result<RaceResult> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO results (runner_id, race_result, location, position, year)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(result.runner_id)
        .bind(result.race_result.to_string())
        .bind(&result.location)
        .bind(result.position)
        .bind(result.year)
        .fetch_one(tx)
        .await
        .map_err(|e| RunnerError::from_insert(e, result.runner_id))?;

        Ok(result.clone().into_result(id))
    }

    /// 在事务中修改成绩，返回修改前的用时和年份
    ///
    /// 成绩归属不可变更：ID 与跑者不匹配时不修改任何行
    pub async fn update_result_in_tx(
        tx: &mut PgConnection,
        result: &RaceResult,
    ) -> Result<Option<ReplacedResult>> {
        let row = sqlx::query_as::<_, ReplacedResultRow>(
            r#"
            UPDATE results AS r
            SET race_result = $3, location = $4, position = $5, year = $6
            FROM (
                SELECT id, race_result, year
                FROM results
                WHERE id = $1 AND runner_id = $2
                FOR UPDATE
            ) AS prev
            WHERE r.id = prev.id
            RETURNING r.runner_id,
                      prev.race_result AS previous_race_result,
                      prev.year AS previous_year
            "#,
        )
        .bind(result.id)
        .bind(result.runner_id)
        .bind(result.race_result.to_string())
        .bind(&result.location)
        .bind(result.position)
        .bind(result.year)
        .fetch_optional(tx)
        .await?;

        row.map(ReplacedResult::try_from).transpose()
    }

    /// 在事务中删除成绩，返回删除前的数据
    pub async fn delete_result_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<RemovedResult>> {
        let row = sqlx::query_as::<_, RemovedResultRow>(
            r#"
            DELETE FROM results
            WHERE id = $1
            RETURNING id, runner_id, race_result, year
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        row.map(RemovedResult::try_from).transpose()
    }

    /// 跑者全部成绩的最小用时
    ///
    /// 用时以定宽文本存储，文本 MIN 与数值最小一致
    pub async fn min_race_time_in_tx(
        tx: &mut PgConnection,
        runner_id: Uuid,
    ) -> Result<Option<RaceTime>> {
        let min = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MIN(race_result) FROM results WHERE runner_id = $1",
        )
        .bind(runner_id)
        .fetch_one(tx)
        .await?;

        min.as_deref().map(parse_stored).transpose()
    }

    /// 跑者某年成绩的最小用时
    pub async fn min_race_time_in_year_in_tx(
        tx: &mut PgConnection,
        runner_id: Uuid,
        year: i32,
    ) -> Result<Option<RaceTime>> {
        let min = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MIN(race_result) FROM results WHERE runner_id = $1 AND year = $2",
        )
        .bind(runner_id)
        .bind(year)
        .fetch_one(tx)
        .await?;

        min.as_deref().map(parse_stored).transpose()
    }
}

#[async_trait]
impl ResultTxStore<PgTx> for ResultRepository {
    async fn insert_result(&self, tx: &mut PgTx, result: &NewRaceResult) -> Result<RaceResult> {
        Self::insert_result_in_tx(&mut **tx, result).await
    }

    async fn update_result(
        &self,
        tx: &mut PgTx,
        result: &RaceResult,
    ) -> Result<Option<ReplacedResult>> {
        Self::update_result_in_tx(&mut **tx, result).await
    }

    async fn delete_result(&self, tx: &mut PgTx, id: Uuid) -> Result<Option<RemovedResult>> {
        Self::delete_result_in_tx(&mut **tx, id).await
    }

    async fn min_race_time(&self, tx: &mut PgTx, runner_id: Uuid) -> Result<Option<RaceTime>> {
        Self::min_race_time_in_tx(&mut **tx, runner_id).await
    }

    async fn min_race_time_in_year(
        &self,
        tx: &mut PgTx,
        runner_id: Uuid,
        year: i32,
    ) -> Result<Option<RaceTime>> {
        Self::min_race_time_in_year_in_tx(&mut **tx, runner_id, year).await
    }
}

#[async_trait]
impl ResultRepositoryTrait for ResultRepository {
    async fn list_results_by_runner(&self, runner_id: Uuid) -> Result<Vec<RaceResult>> {
        self.list_results_by_runner(runner_id).await
    }
}
