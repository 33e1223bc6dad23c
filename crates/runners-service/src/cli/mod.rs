//! CLI 模块
//!
//! ```bash
//! runners-admin migrate
//! runners-admin check
//! runners-admin recompute --runner 6f1c3b52-4a1e-4d89-9d7e-2f0a8c1b9e11
//! runners-admin recompute --all
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands, RecomputeArgs};
pub use runner::{CommandRunner, RecomputeSummary};
