//! 可观测性模块
//!
//! 统一初始化结构化日志，所有二进制入口通过单一入口点配置，
//! 确保日志字段和过滤规则一致。

pub mod tracing;

pub use self::tracing::init as init_logging;
