//! 测试工具模块
//!
//! 提供内存版的事务协调器和仓储实现，用于在没有数据库的情况下
//! 验证成绩生命周期的事务语义。
//!
//! 事务以快照方式实现：`begin` 复制已提交状态，`commit` 整体替换，
//! `rollback` 直接丢弃快照。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::models::{
    NewRaceResult, RaceResult, RaceTime, RemovedResult, ReplacedResult, Runner, RunnerProfile,
};
use crate::repository::{
    ResultRepositoryTrait, ResultTxStore, RunnerRepositoryTrait, RunnerTxStore,
    TransactionCoordinator,
};

#[derive(Debug, Clone, Default)]
struct MemoryData {
    runners: HashMap<Uuid, Runner>,
    results: HashMap<Uuid, RaceResult>,
}

impl MemoryData {
    fn min_race_time(&self, runner_id: Uuid, year: Option<i32>) -> Option<RaceTime> {
        self.results
            .values()
            .filter(|r| r.runner_id == runner_id)
            .filter(|r| year.is_none_or(|y| r.year == y))
            .map(|r| r.race_result)
            .min()
    }

    fn results_of(&self, runner_id: Uuid) -> Vec<RaceResult> {
        let mut results: Vec<RaceResult> = self
            .results
            .values()
            .filter(|r| r.runner_id == runner_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.year.cmp(&a.year).then(a.race_result.cmp(&b.race_result)));
        results
    }
}

#[derive(Debug, Default)]
struct CommittedState {
    data: MemoryData,
    /// 每次提交递增，用于检测并发提交
    version: u64,
}

/// 内存事务
#[derive(Debug)]
pub struct MemoryTx {
    snapshot: MemoryData,
    base_version: u64,
}

/// 内存存储
///
/// 同时实现事务协调器、两个事务存储以及非事务仓储接口
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<CommittedState>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    fail_insert: AtomicBool,
    fail_best_times_update: AtomicBool,
    fail_min_query: AtomicBool,
    fail_rollback: AtomicBool,
}

fn injected(operation: &str) -> RunnerError {
    RunnerError::Internal(format!("injected failure: {}", operation))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 数据准备 ====================

    /// 写入一个在役跑者（无成绩）
    pub async fn seed_runner(&self, first_name: &str, last_name: &str) -> Uuid {
        self.seed_runner_in(first_name, last_name, "Kenya").await
    }

    pub async fn seed_runner_in(&self, first_name: &str, last_name: &str, country: &str) -> Uuid {
        let runner = Runner {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age: 30,
            is_active: true,
            country: country.to_string(),
            personal_best: None,
            season_best: None,
            results: Vec::new(),
        };
        let id = runner.id;
        self.state.write().await.data.runners.insert(id, runner);
        id
    }

    /// 直接写入成绩，不维护最佳成绩（用于构造不一致的数据）
    pub async fn seed_result(&self, runner_id: Uuid, race_result: &str, year: i32) -> Result<Uuid> {
        let result = RaceResult {
            id: Uuid::new_v4(),
            runner_id,
            race_result: RaceTime::parse(race_result)?,
            location: "Seeded".to_string(),
            position: 1,
            year,
        };
        let id = result.id;
        self.state.write().await.data.results.insert(id, result);
        Ok(id)
    }

    /// 直接覆盖跑者的最佳成绩
    pub async fn set_best_times(
        &self,
        runner_id: Uuid,
        personal_best: Option<RaceTime>,
        season_best: Option<RaceTime>,
    ) {
        if let Some(runner) = self.state.write().await.data.runners.get_mut(&runner_id) {
            runner.personal_best = personal_best;
            runner.season_best = season_best;
        }
    }

    // ==================== 已提交状态查询 ====================

    pub async fn runner(&self, id: Uuid) -> Option<Runner> {
        self.state.read().await.data.runners.get(&id).cloned()
    }

    pub async fn results_of(&self, runner_id: Uuid) -> Vec<RaceResult> {
        self.state.read().await.data.results_of(runner_id)
    }

    pub async fn result_count(&self) -> usize {
        self.state.read().await.data.results.len()
    }

    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    // ==================== 故障注入 ====================

    pub fn fail_next_insert(&self) {
        self.fail_insert.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_best_times_update(&self) {
        self.fail_best_times_update.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_min_query(&self) {
        self.fail_min_query.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_rollback(&self) {
        self.fail_rollback.store(true, Ordering::SeqCst);
    }

    fn take(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionCoordinator for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(MemoryTx {
            snapshot: state.data.clone(),
            base_version: state.version,
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        let mut state = self.state.write().await;
        if state.version != tx.base_version {
            return Err(RunnerError::Conflict(
                "another transaction committed first".to_string(),
            ));
        }
        state.data = tx.snapshot;
        state.version += 1;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<()> {
        drop(tx);
        if Self::take(&self.fail_rollback) {
            return Err(injected("rollback"));
        }
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RunnerTxStore<MemoryTx> for MemoryStore {
    async fn get_runner_for_update(&self, tx: &mut MemoryTx, id: Uuid) -> Result<Option<Runner>> {
        Ok(tx.snapshot.runners.get(&id).cloned())
    }

    async fn update_best_times(&self, tx: &mut MemoryTx, runner: &Runner) -> Result<()> {
        if Self::take(&self.fail_best_times_update) {
            return Err(injected("update best times"));
        }
        if let Some(stored) = tx.snapshot.runners.get_mut(&runner.id) {
            stored.personal_best = runner.personal_best;
            stored.season_best = runner.season_best;
        }
        Ok(())
    }
}

#[async_trait]
impl ResultTxStore<MemoryTx> for MemoryStore {
    async fn insert_result(&self, tx: &mut MemoryTx, result: &NewRaceResult) -> Result<RaceResult> {
        if Self::take(&self.fail_insert) {
            return Err(injected("insert result"));
        }
        // 模拟外键约束
        if !tx.snapshot.runners.contains_key(&result.runner_id) {
            return Err(RunnerError::RunnerNotFound(result.runner_id));
        }
        let stored = result.clone().into_result(Uuid::new_v4());
        tx.snapshot.results.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_result(
        &self,
        tx: &mut MemoryTx,
        result: &RaceResult,
    ) -> Result<Option<ReplacedResult>> {
        let Some(stored) = tx
            .snapshot
            .results
            .get_mut(&result.id)
            .filter(|r| r.runner_id == result.runner_id)
        else {
            return Ok(None);
        };

        let replaced = ReplacedResult {
            runner_id: stored.runner_id,
            previous_race_result: stored.race_result,
            previous_year: stored.year,
        };
        *stored = result.clone();
        Ok(Some(replaced))
    }

    async fn delete_result(&self, tx: &mut MemoryTx, id: Uuid) -> Result<Option<RemovedResult>> {
        Ok(tx.snapshot.results.remove(&id).map(|r| RemovedResult {
            id: r.id,
            runner_id: r.runner_id,
            race_result: r.race_result,
            year: r.year,
        }))
    }

    async fn min_race_time(&self, tx: &mut MemoryTx, runner_id: Uuid) -> Result<Option<RaceTime>> {
        if Self::take(&self.fail_min_query) {
            return Err(injected("min race time"));
        }
        Ok(tx.snapshot.min_race_time(runner_id, None))
    }

    async fn min_race_time_in_year(
        &self,
        tx: &mut MemoryTx,
        runner_id: Uuid,
        year: i32,
    ) -> Result<Option<RaceTime>> {
        if Self::take(&self.fail_min_query) {
            return Err(injected("min race time"));
        }
        Ok(tx.snapshot.min_race_time(runner_id, Some(year)))
    }
}

#[async_trait]
impl RunnerRepositoryTrait for MemoryStore {
    async fn create_runner(&self, profile: &RunnerProfile) -> Result<Runner> {
        let runner = Runner {
            id: Uuid::new_v4(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            age: profile.age,
            is_active: true,
            country: profile.country.clone(),
            personal_best: None,
            season_best: None,
            results: Vec::new(),
        };
        self.state
            .write()
            .await
            .data
            .runners
            .insert(runner.id, runner.clone());
        Ok(runner)
    }

    async fn update_runner(&self, id: Uuid, profile: &RunnerProfile) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(runner) = state.data.runners.get_mut(&id) else {
            return Ok(0);
        };
        runner.first_name = profile.first_name.clone();
        runner.last_name = profile.last_name.clone();
        runner.age = profile.age;
        runner.country = profile.country.clone();
        Ok(1)
    }

    async fn deactivate_runner(&self, id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(runner) = state.data.runners.get_mut(&id) else {
            return Ok(0);
        };
        runner.is_active = false;
        Ok(1)
    }

    async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>> {
        Ok(self.runner(id).await)
    }

    async fn list_runners(&self) -> Result<Vec<Runner>> {
        let state = self.state.read().await;
        let mut runners: Vec<Runner> = state.data.runners.values().cloned().collect();
        runners.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(runners)
    }

    async fn list_top_runners_by_country(&self, country: &str, limit: i64) -> Result<Vec<Runner>> {
        let state = self.state.read().await;
        let mut runners: Vec<Runner> = state
            .data
            .runners
            .values()
            .filter(|r| r.is_active && r.country == country)
            .cloned()
            .collect();
        // 未设置最佳成绩的排在最后
        runners.sort_by_key(|r| (r.personal_best.is_none(), r.personal_best));
        runners.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(runners)
    }

    async fn list_top_runners_by_year(&self, year: i32, limit: i64) -> Result<Vec<Runner>> {
        let state = self.state.read().await;
        let mut ranked: Vec<(RaceTime, Runner)> = state
            .data
            .runners
            .values()
            .filter_map(|runner| {
                state
                    .data
                    .min_race_time(runner.id, Some(year))
                    .map(|best| (best, runner.clone()))
            })
            .collect();
        ranked.sort_by_key(|(best, _)| *best);
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked.into_iter().map(|(_, runner)| runner).collect())
    }

    async fn list_runner_ids(&self) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut ids: Vec<Uuid> = state.data.runners.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ResultRepositoryTrait for MemoryStore {
    async fn list_results_by_runner(&self, runner_id: Uuid) -> Result<Vec<RaceResult>> {
        Ok(self.results_of(runner_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rollback_discards_snapshot() {
        let store = MemoryStore::new();
        let runner_id = store.seed_runner("Paula", "Radcliffe").await;

        let mut tx = store.begin().await.unwrap();
        let new_result = NewRaceResult {
            runner_id,
            race_result: RaceTime::parse("02:15:25").unwrap(),
            location: "London".to_string(),
            position: 1,
            year: 2003,
        };
        store.insert_result(&mut tx, &new_result).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(store.result_count().await, 0);
        assert_eq!(store.rollback_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_applies_snapshot() {
        let store = MemoryStore::new();
        let runner_id = store.seed_runner("Paula", "Radcliffe").await;
        store.seed_result(runner_id, "02:15:25", 2003).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            store.min_race_time(&mut tx, runner_id).await.unwrap(),
            Some(RaceTime::parse("02:15:25").unwrap())
        );
        assert!(store.min_race_time_in_year(&mut tx, runner_id, 2004).await.unwrap().is_none());
        store.commit(tx).await.unwrap();
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_commit_conflicts() {
        let store = MemoryStore::new();
        store.seed_runner("Paula", "Radcliffe").await;

        let first = store.begin().await.unwrap();
        let second = store.begin().await.unwrap();
        store.commit(first).await.unwrap();

        let err = store.commit(second).await.unwrap_err();
        assert!(matches!(err, RunnerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let store = MemoryStore::new();
        let runner_id = store.seed_runner("Paula", "Radcliffe").await;
        store.fail_next_min_query();

        let mut tx = store.begin().await.unwrap();
        assert!(store.min_race_time(&mut tx, runner_id).await.is_err());
        assert!(store.min_race_time(&mut tx, runner_id).await.is_ok());
    }
}
