//! 跑者成绩服务
//!
//! 管理跑者档案与比赛成绩，并在事务内维护每位跑者缓存的
//! 历史最佳（personal best）和赛季最佳（season best）。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型与比赛用时编解码
//! - `error`: 错误类型与错误分类
//! - `validation`: 请求校验
//! - `aggregate`: 最佳成绩的增量更新与重算
//! - `repository`: PostgreSQL 仓储与事务协调器
//! - `service`: 成绩生命周期服务、跑者管理服务
//! - `cli`: 运维命令行
//! - `test_utils`: 内存存储实现

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod test_utils;
pub mod validation;

pub use error::{ErrorStatus, ResponseError, Result, RunnerError};
pub use models::*;
pub use service::{PgResultService, ResultService, RunnerService, dto};

/// 服务名，用于加载 config/{SERVICE_NAME}.toml
pub const SERVICE_NAME: &str = "runners-service";

/// 内嵌的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
