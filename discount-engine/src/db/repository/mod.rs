//! Repository Module
//!
//! CRUD helpers over the SQLite pool. Every function takes the pool (or any
//! `SqliteExecutor`, so it can run inside a transaction) as first argument.

// Catalogue
pub mod channel;
pub mod product_collection;
pub mod user;

// Vouchers
pub mod voucher;
pub mod voucher_code;
pub mod voucher_customer;

// Orders
pub mod order;
pub mod order_discount;
pub mod order_line;
pub mod order_line_discount;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
