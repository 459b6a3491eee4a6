//! Voucher error types

use crate::db::repository::RepoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscountError {
    /// Voucher rule rejected; the message is shown to the customer
    #[error("{0}")]
    NotApplicable(String),

    #[error("Promo code is invalid")]
    InvalidPromoCode,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl DiscountError {
    pub fn not_applicable(msg: impl Into<String>) -> Self {
        Self::NotApplicable(msg.into())
    }
}

impl From<sqlx::Error> for DiscountError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repo(err.into())
    }
}

impl From<validator::ValidationErrors> for DiscountError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type DiscountResult<T> = Result<T, DiscountError>;
