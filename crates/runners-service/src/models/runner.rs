//! 跑者实体定义
//!
//! 包含跑者档案、聚合成绩字段以及数据库行到领域对象的转换

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::race_time::RaceTime;
use super::result::RaceResult;
use crate::error::RunnerError;

/// 跑者
///
/// `personal_best` / `season_best` 为缓存的聚合字段，
/// 由成绩的创建、修改、删除维护，`None` 表示尚无成绩
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runner {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    /// 逻辑删除标记
    pub is_active: bool,
    pub country: String,
    /// 历史最佳
    pub personal_best: Option<RaceTime>,
    /// 本赛季最佳
    pub season_best: Option<RaceTime>,
    /// 成绩列表（仅详情查询时加载）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<RaceResult>,
}

impl Runner {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 跑者档案（创建/修改时写入的字段）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerProfile {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub country: String,
}

/// runners 表行
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RunnerRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub is_active: bool,
    pub country: String,
    pub personal_best: Option<String>,
    pub season_best: Option<String>,
}

impl TryFrom<RunnerRow> for Runner {
    type Error = RunnerError;

    fn try_from(row: RunnerRow) -> Result<Self, Self::Error> {
        let personal_best = decode_best(row.personal_best.as_deref(), "personal best")?;
        let season_best = decode_best(row.season_best.as_deref(), "season best")?;

        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            age: row.age,
            is_active: row.is_active,
            country: row.country,
            personal_best,
            season_best,
            results: Vec::new(),
        })
    }
}

/// 解码存储的最佳成绩；空串视同未设置
fn decode_best(value: Option<&str>, field: &str) -> Result<Option<RaceTime>, RunnerError> {
    match value {
        None | Some("") => Ok(None),
        Some(text) => RaceTime::parse(text)
            .map(Some)
            .map_err(|_| RunnerError::Internal(format!("Failed to parse {}", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(personal_best: Option<&str>, season_best: Option<&str>) -> RunnerRow {
        RunnerRow {
            id: Uuid::new_v4(),
            first_name: "Adam".to_string(),
            last_name: "Smith".to_string(),
            age: 30,
            is_active: true,
            country: "United States".to_string(),
            personal_best: personal_best.map(str::to_string),
            season_best: season_best.map(str::to_string),
        }
    }

    #[test]
    fn test_row_decoding_with_bests() {
        let runner = Runner::try_from(row(Some("01:18:28"), Some("02:00:41"))).unwrap();
        assert_eq!(runner.personal_best, Some(RaceTime::parse("01:18:28").unwrap()));
        assert_eq!(runner.season_best, Some(RaceTime::parse("02:00:41").unwrap()));
        assert!(runner.results.is_empty());
        assert_eq!(runner.full_name(), "Adam Smith");
    }

    #[test]
    fn test_row_decoding_without_bests() {
        let runner = Runner::try_from(row(None, Some(""))).unwrap();
        assert!(runner.personal_best.is_none());
        assert!(runner.season_best.is_none());
    }

    #[test]
    fn test_row_decoding_corrupt_best_is_internal() {
        let err = Runner::try_from(row(Some("garbage"), None)).unwrap_err();
        assert!(matches!(err, RunnerError::Internal(ref msg) if msg == "Failed to parse personal best"));

        let err = Runner::try_from(row(None, Some("1:2:3"))).unwrap_err();
        assert!(matches!(err, RunnerError::Internal(ref msg) if msg == "Failed to parse season best"));
    }

    #[test]
    fn test_serialization_skips_unloaded_results() {
        let runner = Runner::try_from(row(Some("01:18:28"), None)).unwrap();
        let json = serde_json::to_value(&runner).unwrap();
        assert_eq!(json["personalBest"], "01:18:28");
        assert!(json["seasonBest"].is_null());
        assert!(json.get("results").is_none());
    }
}
