//! 服务层数据传输对象
//!
//! 请求对象保留客户端提交的原始文本，由校验模块转换为领域类型

use serde::{Deserialize, Serialize};

use crate::models::RunnerProfile;

/// 创建跑者请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub country: String,
}

impl RunnerRequest {
    /// 转换为待写入的档案（去除首尾空白）
    pub fn to_profile(&self) -> RunnerProfile {
        RunnerProfile {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            age: self.age,
            country: self.country.trim().to_string(),
        }
    }
}

/// 修改跑者请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRunnerRequest {
    pub id: String,
    #[serde(flatten)]
    pub profile: RunnerRequest,
}

/// 创建成绩请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRequest {
    pub runner_id: String,
    /// `HH:MM:SS`
    pub race_result: String,
    pub location: String,
    pub position: i32,
    pub year: i32,
}

/// 修改成绩请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResultRequest {
    pub id: String,
    #[serde(flatten)]
    pub result: ResultRequest,
}

/// 跑者列表过滤条件
///
/// 两个条件互斥，空字符串视同未传
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl RunnerFilter {
    pub fn by_country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            year: None,
        }
    }

    pub fn by_year(year: impl Into<String>) -> Self {
        Self {
            country: None,
            year: Some(year.into()),
        }
    }

    pub(crate) fn country(&self) -> Option<&str> {
        self.country.as_deref().filter(|c| !c.is_empty())
    }

    pub(crate) fn year(&self) -> Option<&str> {
        self.year.as_deref().filter(|y| !y.is_empty())
    }
}

/// 跑者列表查询方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerQuery {
    All,
    TopByCountry(String),
    TopByYear(i32),
}
