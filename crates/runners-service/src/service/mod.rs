//! 服务层
//!
//! - `dto`: 请求对象定义
//! - `result_service`: 成绩生命周期（事务内维护最佳成绩）
//! - `runner_service`: 跑者档案管理与排行查询

pub mod dto;
pub mod result_service;
pub mod runner_service;

pub use dto::*;
pub use result_service::{LifecycleStage, PgResultService, ResultService};
pub use runner_service::RunnerService;
