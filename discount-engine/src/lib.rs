//! Discount Engine - 优惠券折扣引擎
//!
//! # 架构概述
//!
//! 负责优惠券 (voucher) 的分类、折扣金额计算、使用次数统计，
//! 以及订单/订单行上折扣对象的同步：
//!
//! - **金额** (`money`): Decimal 计算，按币种精度取整
//! - **优惠券** (`vouchers`): 分类、计算、校验、使用次数、折扣对象同步
//! - **订单** (`orders`): 草稿订单绑定/解绑优惠券、手动折扣、折扣汇总
//! - **数据库** (`db`): SQLite 存储 (sqlx)
//!
//! # 模块结构
//!
//! ```text
//! discount-engine/src/
//! ├── core/          # 配置、服务状态
//! ├── db/            # 连接池、迁移、仓储
//! ├── money/         # 金额计算
//! ├── vouchers/      # 优惠券逻辑
//! ├── orders/        # 订单折扣流程
//! └── utils/         # 日志
//! ```

pub mod core;
pub mod db;
pub mod money;
pub mod orders;
pub mod utils;
pub mod vouchers;

// Re-export 公共类型
pub use core::{Config, DiscountService};
pub use db::DbService;
pub use db::repository::{RepoError, RepoResult};
pub use vouchers::{DiscountError, DiscountResult, VoucherInfo};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境
///
/// 加载 `.env`，创建工作目录，初始化日志。返回加载好的配置。
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(config)
}
