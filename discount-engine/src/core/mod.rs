//! 核心模块 - 配置和服务状态
//!
//! - [`Config`] - 引擎配置
//! - [`DiscountService`] - 数据库连接 + 配置

pub mod config;
pub mod state;

pub use config::Config;
pub use state::DiscountService;
