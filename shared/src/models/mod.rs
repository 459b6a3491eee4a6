//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.
//! Monetary amounts are stored as `f64`; arithmetic happens in `Decimal`.

pub mod channel;
pub mod checkout;
pub mod discount;
pub mod order;
pub mod user;
pub mod voucher;

// Re-exports
pub use channel::*;
pub use checkout::*;
pub use discount::*;
pub use order::*;
pub use user::*;
pub use voucher::*;
