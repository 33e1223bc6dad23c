//! 请求校验
//!
//! 所有校验都在事务开始前完成，失败时不产生任何存储副作用

use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::models::{NewRaceResult, RaceTime, RunnerProfile};
use crate::service::dto::{ResultRequest, RunnerFilter, RunnerQuery, RunnerRequest};

/// 跑者年龄下限（不含）
pub const MIN_RUNNER_AGE: i32 = 16;
/// 跑者年龄上限（含）
pub const MAX_RUNNER_AGE: i32 = 125;
/// 排行查询返回条数
pub const TOP_RUNNERS_LIMIT: i64 = 10;

/// 校验成绩提交的结构约束
///
/// 用时文本只检查非空，可解析性由 [`parse_result_request`] 单独检查
pub fn validate_result(result: &ResultRequest, current_year: i32) -> Result<()> {
    if result.runner_id.is_empty() {
        return Err(RunnerError::validation("Invalid Runner ID"));
    }
    if result.race_result.is_empty() {
        return Err(RunnerError::validation("Invalid race result"));
    }
    if result.location.is_empty() {
        return Err(RunnerError::validation("Invalid location"));
    }
    if result.position < 0 {
        return Err(RunnerError::validation("Invalid position"));
    }
    validate_year(result.year, current_year)
}

/// 校验跑者档案
pub fn validate_runner(runner: &RunnerRequest) -> Result<()> {
    if runner.first_name.trim().is_empty() {
        return Err(RunnerError::validation("Invalid first name"));
    }
    if runner.last_name.trim().is_empty() {
        return Err(RunnerError::validation("Invalid last name"));
    }
    if runner.age <= MIN_RUNNER_AGE || runner.age > MAX_RUNNER_AGE {
        return Err(RunnerError::validation("Invalid age"));
    }
    if runner.country.trim().is_empty() {
        return Err(RunnerError::validation("Invalid country"));
    }
    Ok(())
}

/// 校验跑者 ID 格式（不检查是否存在）
pub fn validate_runner_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| RunnerError::validation("Invalid runner ID"))
}

/// 校验成绩 ID 格式
pub fn validate_result_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| RunnerError::validation("Invalid result ID"))
}

fn validate_year(year: i32, current_year: i32) -> Result<()> {
    if year < 0 || year > current_year {
        return Err(RunnerError::validation("Invalid year"));
    }
    Ok(())
}

/// 校验并解析成绩提交：结构校验 → 跑者 ID → 用时解析
pub fn parse_result_request(result: &ResultRequest, current_year: i32) -> Result<NewRaceResult> {
    validate_result(result, current_year)?;
    let runner_id = validate_runner_id(&result.runner_id)?;
    let race_result = RaceTime::parse(&result.race_result)?;

    Ok(NewRaceResult {
        runner_id,
        race_result,
        location: result.location.clone(),
        position: result.position,
        year: result.year,
    })
}

/// 校验并转换跑者档案
pub fn parse_runner_request(runner: &RunnerRequest) -> Result<RunnerProfile> {
    validate_runner(runner)?;
    Ok(runner.to_profile())
}

/// 解析跑者列表过滤条件
pub fn parse_runner_filter(filter: &RunnerFilter, current_year: i32) -> Result<RunnerQuery> {
    match (filter.country(), filter.year()) {
        (Some(_), Some(_)) => Err(RunnerError::validation("Only one parameter can be passed")),
        (Some(country), None) => Ok(RunnerQuery::TopByCountry(country.to_string())),
        (None, Some(year)) => {
            let year: i32 = year
                .parse()
                .map_err(|_| RunnerError::validation("Invalid year"))?;
            validate_year(year, current_year)?;
            Ok(RunnerQuery::TopByYear(year))
        }
        (None, None) => Ok(RunnerQuery::All),
    }
}
