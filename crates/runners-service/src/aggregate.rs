//! 跑者最佳成绩聚合
//!
//! 新增成绩只会让最佳成绩变好（单向棘轮）；删除或替换成绩时，
//! 若被移除的用时恰为当前最佳，则从剩余成绩重新求最小值。

use crate::error::Result;
use crate::models::{RaceTime, RemovedResult, Runner};
use crate::repository::ResultTxStore;

/// 聚合字段的变化
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestTimesChange {
    pub personal_best: bool,
    pub season_best: bool,
}

impl BestTimesChange {
    pub fn any(&self) -> bool {
        self.personal_best || self.season_best
    }
}

/// 新增路径：用一条新成绩更新跑者的最佳成绩
///
/// 只采纳严格更小的用时；赛季最佳仅在成绩年份等于当前赛季时参与比较
pub fn apply_result(
    runner: &mut Runner,
    race_time: RaceTime,
    year: i32,
    current_year: i32,
) -> BestTimesChange {
    let mut change = BestTimesChange::default();

    if improves(runner.personal_best, race_time) {
        runner.personal_best = Some(race_time);
        change.personal_best = true;
    }

    if year == current_year && improves(runner.season_best, race_time) {
        runner.season_best = Some(race_time);
        change.season_best = true;
    }

    change
}

fn improves(current: Option<RaceTime>, candidate: RaceTime) -> bool {
    current.is_none_or(|best| candidate < best)
}

/// 删除路径需要重新查询的字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub recompute_personal_best: bool,
    pub recompute_season_best: bool,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        !self.recompute_personal_best && !self.recompute_season_best
    }
}

/// 判断移除一条成绩后哪些最佳成绩失效
///
/// 按用时数值比较而非按成绩 ID，存在同用时的其他成绩时重算结果不变
pub fn reconcile_plan(runner: &Runner, removed: &RemovedResult, current_year: i32) -> ReconcilePlan {
    ReconcilePlan {
        recompute_personal_best: runner.personal_best == Some(removed.race_result),
        recompute_season_best: removed.year == current_year
            && runner.season_best == Some(removed.race_result),
    }
}

/// 删除路径：按需从存储中重算最佳成绩
///
/// 剩余成绩为空时对应字段置为 None
pub async fn reconcile_after_removal<Tx, S>(
    store: &S,
    tx: &mut Tx,
    runner: &mut Runner,
    removed: &RemovedResult,
    current_year: i32,
) -> Result<BestTimesChange>
where
    Tx: Send,
    S: ResultTxStore<Tx> + ?Sized,
{
    let plan = reconcile_plan(runner, removed, current_year);
    let mut change = BestTimesChange::default();
    if plan.is_noop() {
        return Ok(change);
    }

    if plan.recompute_personal_best {
        let best = store.min_race_time(tx, runner.id).await?;
        change.personal_best = best != runner.personal_best;
        runner.personal_best = best;
    }

    if plan.recompute_season_best {
        let best = store
            .min_race_time_in_year(tx, runner.id, current_year)
            .await?;
        change.season_best = best != runner.season_best;
        runner.season_best = best;
    }

    Ok(change)
}

/// 全量重算：从存储中重新推导两项最佳成绩
pub async fn recompute_from_store<Tx, S>(
    store: &S,
    tx: &mut Tx,
    runner: &mut Runner,
    current_year: i32,
) -> Result<BestTimesChange>
where
    Tx: Send,
    S: ResultTxStore<Tx> + ?Sized,
{
    let personal_best = store.min_race_time(tx, runner.id).await?;
    let season_best = store
        .min_race_time_in_year(tx, runner.id, current_year)
        .await?;

    let change = BestTimesChange {
        personal_best: personal_best != runner.personal_best,
        season_best: season_best != runner.season_best,
    };
    runner.personal_best = personal_best;
    runner.season_best = season_best;

    Ok(change)
}
