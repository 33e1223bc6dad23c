//! 跑者服务领域模型
//!
//! 包含跑者、成绩以及比赛用时的核心定义

pub mod race_time;
pub mod result;
pub mod runner;

// 重新导出常用类型
pub use race_time::{RaceTime, RaceTimeError};
pub use result::{NewRaceResult, RaceResult, RemovedResult, ReplacedResult};
pub use runner::{Runner, RunnerProfile};

pub(crate) use result::{RaceResultRow, RemovedResultRow, ReplacedResultRow, parse_stored};
pub(crate) use runner::RunnerRow;
