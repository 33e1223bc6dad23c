//! CLI 命令定义

use clap::{Args, Parser, Subcommand};

/// 跑者服务运维工具
#[derive(Parser, Debug)]
#[command(name = "runners-admin")]
#[command(version, about = "跑者成绩服务运维工具")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 执行数据库迁移
    Migrate,

    /// 检查数据库连通性
    Check,

    /// 从成绩记录重新推导跑者的最佳成绩
    ///
    /// 用于修复并发提交造成的聚合字段不一致
    Recompute(RecomputeArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct RecomputeArgs {
    /// 跑者 ID
    #[arg(long)]
    pub runner: Option<String>,

    /// 重算所有跑者
    #[arg(long)]
    pub all: bool,
}
