//! 日志初始化
//!
//! 基于 tracing-subscriber 组合环境过滤器和输出层，
//! 支持 pretty（本地开发）与 json（生产采集）两种格式。

use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;
use crate::error::{Result, SharedError};

/// 构建环境过滤器
///
/// RUST_LOG 优先，其次是配置中的日志级别，均无效时回落到 info
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局日志订阅器
///
/// 重复初始化返回 `SharedError::Logging`，调用方可选择忽略
pub fn init(config: &LoggingConfig) -> Result<()> {
    let fmt_layer = if config.is_json() {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SharedError::Logging(e.to_string()))
}
