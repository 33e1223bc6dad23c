//! 数据库仓储层
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 事务由服务层通过 `TransactionCoordinator` 开启，并作为参数显式传入
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod result_repo;
mod runner_repo;
mod traits;
mod transaction;

pub use result_repo::ResultRepository;
pub use runner_repo::RunnerRepository;
pub use traits::*;
pub use transaction::{PgTransactionCoordinator, PgTx};
