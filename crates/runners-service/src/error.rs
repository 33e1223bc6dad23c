//! 跑者服务错误类型
//!
//! 服务层只负责错误分类，由请求处理层将 `ErrorStatus` 映射为传输层状态码

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::RaceTimeError;

/// PostgreSQL 外键约束冲突
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// 跑者服务错误类型
#[derive(Debug, Error)]
pub enum RunnerError {
    // === 客户端错误 ===
    #[error("{0}")]
    Validation(String),

    #[error("Invalid race result")]
    Format(#[source] RaceTimeError),

    // === 资源不存在 ===
    #[error("Runner not found")]
    RunnerNotFound(Uuid),

    #[error("Result not found")]
    ResultNotFound(Uuid),

    /// 预留给并发修改检测
    #[error("Conflict: {0}")]
    Conflict(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<RaceTimeError> for RunnerError {
    fn from(err: RaceTimeError) -> Self {
        Self::Format(err)
    }
}

/// 跑者服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RunnerError>;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    Unauthorized,
    Conflict,
    Internal,
}

impl RunnerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 插入成绩时的数据库错误归类：外键冲突说明跑者不存在
    pub fn from_insert(err: sqlx::Error, runner_id: Uuid) -> Self {
        let is_fk_violation = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);

        if is_fk_violation {
            Self::RunnerNotFound(runner_id)
        } else {
            Self::Database(err)
        }
    }

    /// 错误分类
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::Validation(_) | Self::Format(_) => ErrorStatus::BadRequest,
            Self::RunnerNotFound(_) | Self::ResultNotFound(_) => ErrorStatus::NotFound,
            Self::Database(sqlx::Error::RowNotFound) => ErrorStatus::NotFound,
            Self::Conflict(_) => ErrorStatus::Conflict,
            Self::Database(_) | Self::Internal(_) => ErrorStatus::Internal,
        }
    }

    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Format(_) => "INVALID_RACE_TIME",
            Self::RunnerNotFound(_) => "RUNNER_NOT_FOUND",
            Self::ResultNotFound(_) => "RESULT_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(sqlx::Error::RowNotFound) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == ErrorStatus::NotFound
    }
}

/// 返回给请求处理层的错误结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    pub message: String,
    pub status: ErrorStatus,
}

impl From<RunnerError> for ResponseError {
    fn from(err: RunnerError) -> Self {
        let status = err.status();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &err {
            RunnerError::Database(sqlx::Error::RowNotFound) => "Not found".to_string(),
            RunnerError::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "Internal server error".to_string()
            }
            RunnerError::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        Self { message, status }
    }
}
