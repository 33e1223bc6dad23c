//! 跑者仓储
//!
//! 提供跑者档案的数据访问，以及事务内的聚合字段读写

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::{RunnerRepositoryTrait, RunnerTxStore};
use super::transaction::PgTx;
use crate::error::Result;
use crate::models::{Runner, RunnerProfile, RunnerRow};

const RUNNER_COLUMNS: &str =
    "id, first_name, last_name, age, is_active, country, personal_best, season_best";

/// 跑者仓储
pub struct RunnerRepository {
    pool: PgPool,
}

fn decode_all(rows: Vec<RunnerRow>) -> Result<Vec<Runner>> {
    rows.into_iter().map(Runner::try_from).collect()
}

impl RunnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    pub async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>> {
        let row = sqlx::query_as::<_, RunnerRow>(&format!(
            "SELECT {RUNNER_COLUMNS} FROM runners WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Runner::try_from).transpose()
    }

    pub async fn list_runners(&self) -> Result<Vec<Runner>> {
        let rows = sqlx::query_as::<_, RunnerRow>(&format!(
            "SELECT {RUNNER_COLUMNS} FROM runners ORDER BY last_name, first_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    /// 某国家在役跑者按历史最佳排序
    pub async fn list_top_runners_by_country(
        &self,
        country: &str,
        limit: i64,
    ) -> Result<Vec<Runner>> {
        let rows = sqlx::query_as::<_, RunnerRow>(&format!(
            r#"
            SELECT {RUNNER_COLUMNS}
            FROM runners
            WHERE country = $1 AND is_active = TRUE
            ORDER BY personal_best NULLS LAST
            LIMIT $2
            "#
        ))
        .bind(country)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    /// 按跑者在某年的最好成绩排序
    pub async fn list_top_runners_by_year(&self, year: i32, limit: i64) -> Result<Vec<Runner>> {
        let rows = sqlx::query_as::<_, RunnerRow>(
            r#"
            SELECT r.id, r.first_name, r.last_name, r.age, r.is_active, r.country,
                   r.personal_best, r.season_best
            FROM runners r
            INNER JOIN (
                SELECT runner_id, MIN(race_result) AS race_result
                FROM results
                WHERE year = $1
                GROUP BY runner_id
            ) best ON r.id = best.runner_id
            ORDER BY best.race_result
            LIMIT $2
            "#,
        )
        .bind(year)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        decode_all(rows)
    }

    pub async fn list_runner_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM runners ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    // ==================== 写入操作 ====================

    pub async fn create_runner(&self, profile: &RunnerProfile) -> Result<Runner> {
        let row = sqlx::query_as::<_, RunnerRow>(&format!(
            r#"
            INSERT INTO runners (first_name, last_name, age, country)
            VALUES ($1, $2, $3, $4)
            RETURNING {RUNNER_COLUMNS}
            "#
        ))
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.age)
        .bind(&profile.country)
        .fetch_one(&self.pool)
        .await?;

        Runner::try_from(row)
    }

    /// 修改跑者档案，返回影响行数
    pub async fn update_runner(&self, id: Uuid, profile: &RunnerProfile) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE runners
            SET first_name = $2, last_name = $3, age = $4, country = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.age)
        .bind(&profile.country)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 逻辑删除跑者
    pub async fn deactivate_runner(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE runners SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取跑者（带行级锁）
    ///
    /// 同一跑者的并发成绩提交在此处串行化聚合字段的读改写
    pub async fn get_runner_for_update_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Runner>> {
        let row = sqlx::query_as::<_, RunnerRow>(&format!(
            "SELECT {RUNNER_COLUMNS} FROM runners WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(tx)
        .await?;

        row.map(Runner::try_from).transpose()
    }

    /// 在事务中写回聚合字段
    pub async fn update_best_times_in_tx(tx: &mut PgConnection, runner: &Runner) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE runners
            SET personal_best = $2, season_best = $3
            WHERE id = $1
            "#,
        )
        .bind(runner.id)
        .bind(runner.personal_best.map(|t| t.to_string()))
        .bind(runner.season_best.map(|t| t.to_string()))
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RunnerTxStore<PgTx> for RunnerRepository {
    async fn get_runner_for_update(&self, tx: &mut PgTx, id: Uuid) -> Result<Option<Runner>> {
        Self::get_runner_for_update_in_tx(&mut **tx, id).await
    }

    async fn update_best_times(&self, tx: &mut PgTx, runner: &Runner) -> Result<()> {
        Self::update_best_times_in_tx(&mut **tx, runner).await
    }
}

#[async_trait]
impl RunnerRepositoryTrait for RunnerRepository {
    async fn create_runner(&self, profile: &RunnerProfile) -> Result<Runner> {
        self.create_runner(profile).await
    }

    async fn update_runner(&self, id: Uuid, profile: &RunnerProfile) -> Result<u64> {
        self.update_runner(id, profile).await
    }

    async fn deactivate_runner(&self, id: Uuid) -> Result<u64> {
        self.deactivate_runner(id).await
    }

    async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>> {
        self.get_runner(id).await
    }

    async fn list_runners(&self) -> Result<Vec<Runner>> {
        self.list_runners().await
    }

    async fn list_top_runners_by_country(&self, country: &str, limit: i64) -> Result<Vec<Runner>> {
        self.list_top_runners_by_country(country, limit).await
    }

    async fn list_top_runners_by_year(&self, year: i32, limit: i64) -> Result<Vec<Runner>> {
        self.list_top_runners_by_year(year, limit).await
    }

    async fn list_runner_ids(&self) -> Result<Vec<Uuid>> {
        self.list_runner_ids().await
    }
}
