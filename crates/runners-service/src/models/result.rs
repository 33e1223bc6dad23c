//! 比赛成绩实体定义

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::race_time::RaceTime;
use crate::error::RunnerError;

/// 比赛成绩
///
/// 每条成绩归属唯一跑者（外键），创建后归属不可变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub id: Uuid,
    pub runner_id: Uuid,
    pub race_result: RaceTime,
    pub location: String,
    pub position: i32,
    pub year: i32,
}

/// 待写入的成绩
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRaceResult {
    pub runner_id: Uuid,
    pub race_result: RaceTime,
    pub location: String,
    pub position: i32,
    pub year: i32,
}

impl NewRaceResult {
    pub fn into_result(self, id: Uuid) -> RaceResult {
        RaceResult {
            id,
            runner_id: self.runner_id,
            race_result: self.race_result,
            location: self.location,
            position: self.position,
            year: self.year,
        }
    }
}

/// 删除成绩时取回的删除前数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedResult {
    pub id: Uuid,
    pub runner_id: Uuid,
    pub race_result: RaceTime,
    pub year: i32,
}

/// 修改成绩时取回的修改前数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacedResult {
    pub runner_id: Uuid,
    pub previous_race_result: RaceTime,
    pub previous_year: i32,
}

impl ReplacedResult {
    /// 以删除视角描述被替换的旧值，用于复用删除后的聚合重算
    pub fn as_removed(&self, id: Uuid) -> RemovedResult {
        RemovedResult {
            id,
            runner_id: self.runner_id,
            race_result: self.previous_race_result,
            year: self.previous_year,
        }
    }
}

/// results 表行
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RaceResultRow {
    pub id: Uuid,
    pub runner_id: Uuid,
    pub race_result: String,
    pub location: String,
    pub position: i32,
    pub year: i32,
}

impl TryFrom<RaceResultRow> for RaceResult {
    type Error = RunnerError;

    fn try_from(row: RaceResultRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            runner_id: row.runner_id,
            race_result: parse_stored(&row.race_result)?,
            location: row.location,
            position: row.position,
            year: row.year,
        })
    }
}

/// DELETE ... RETURNING 行
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RemovedResultRow {
    pub id: Uuid,
    pub runner_id: Uuid,
    pub race_result: String,
    pub year: i32,
}

impl TryFrom<RemovedResultRow> for RemovedResult {
    type Error = RunnerError;

    fn try_from(row: RemovedResultRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            runner_id: row.runner_id,
            race_result: parse_stored(&row.race_result)?,
            year: row.year,
        })
    }
}

/// UPDATE ... RETURNING 行
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ReplacedResultRow {
    pub runner_id: Uuid,
    pub previous_race_result: String,
    pub previous_year: i32,
}

impl TryFrom<ReplacedResultRow> for ReplacedResult {
    type Error = RunnerError;

    fn try_from(row: ReplacedResultRow) -> Result<Self, Self::Error> {
        Ok(Self {
            runner_id: row.runner_id,
            previous_race_result: parse_stored(&row.previous_race_result)?,
            previous_year: row.previous_year,
        })
    }
}

/// 解析库中存储的用时，损坏数据视为内部错误
pub(crate) fn parse_stored(text: &str) -> Result<RaceTime, RunnerError> {
    RaceTime::parse(text)
        .map_err(|e| RunnerError::Internal(format!("Failed to parse stored race result: {}", e)))
}
