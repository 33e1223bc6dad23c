//! PostgreSQL 事务协调器

use async_trait::async_trait;
use runners_shared::config::IsolationLevel;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::traits::TransactionCoordinator;
use crate::error::Result;

/// PostgreSQL 事务句柄
pub type PgTx = Transaction<'static, Postgres>;

/// 基于连接池的事务协调器
///
/// 每次 `begin` 从池中取出连接并按配置设置隔离级别
#[derive(Clone)]
pub struct PgTransactionCoordinator {
    pool: PgPool,
    isolation_level: IsolationLevel,
}

impl PgTransactionCoordinator {
    pub fn new(pool: PgPool, isolation_level: IsolationLevel) -> Self {
        Self {
            pool,
            isolation_level,
        }
    }
}

#[async_trait]
impl TransactionCoordinator for PgTransactionCoordinator {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let mut tx = self.pool.begin().await?;

        // 必须是事务中的第一条语句
        let statement = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation_level.as_sql()
        );
        sqlx::query(&statement).execute(&mut *tx).await?;

        debug!(isolation = self.isolation_level.as_sql(), "事务已开启");
        Ok(tx)
    }

    async fn commit(&self, tx: PgTx) -> Result<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: PgTx) -> Result<()> {
        tx.rollback().await?;
        Ok(())
    }
}
