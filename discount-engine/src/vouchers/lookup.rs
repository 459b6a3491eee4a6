//! Voucher code lookup and generation

use super::error::{DiscountError, DiscountResult};
use crate::db::repository::{RepoError, RepoResult, voucher, voucher_code};
use shared::models::{Voucher, VoucherCode};
use sqlx::SqlitePool;

/// Length of generated codes
const CODE_LENGTH: usize = 12;

/// Attempts before giving up on finding a free code
const MAX_GENERATE_ATTEMPTS: usize = 10;

/// Resolve an entered code to its instance
///
/// Fails with `InvalidPromoCode` unless the code is active and its voucher is
/// active in the channel at `now`.
pub async fn get_voucher_code_instance(
    pool: &SqlitePool,
    code: &str,
    channel_slug: &str,
    now: i64,
) -> DiscountResult<VoucherCode> {
    if !voucher::exists_active_with_code(pool, code, channel_slug, now).await? {
        tracing::debug!(code = %code, channel = %channel_slug, "Voucher code rejected");
        return Err(DiscountError::InvalidPromoCode);
    }
    voucher_code::find_by_code(pool, code)
        .await?
        .ok_or(DiscountError::InvalidPromoCode)
}

/// First active code of a voucher that is active in the channel
pub async fn get_active_voucher_code(
    pool: &SqlitePool,
    voucher: &Voucher,
    channel_slug: &str,
    now: i64,
) -> DiscountResult<VoucherCode> {
    if !voucher::is_active_in_channel(pool, voucher.id, channel_slug, now).await? {
        return Err(DiscountError::InvalidPromoCode);
    }
    voucher_code::find_first_active(pool, voucher.id)
        .await?
        .ok_or(DiscountError::InvalidPromoCode)
}

/// Random upper-case code not used by any voucher yet
pub async fn generate_voucher_code(pool: &SqlitePool) -> RepoResult<String> {
    for _ in 0..MAX_GENERATE_ATTEMPTS {
        let candidate: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .to_uppercase()
            .chars()
            .take(CODE_LENGTH)
            .collect();
        if voucher_code::find_by_code(pool, &candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(RepoError::Duplicate(
        "Could not generate a unique voucher code".into(),
    ))
}

/// Create the given codes for a voucher, or one generated code when `None`
pub async fn create_voucher_codes(
    pool: &SqlitePool,
    voucher_id: i64,
    codes: Option<Vec<String>>,
) -> DiscountResult<Vec<VoucherCode>> {
    let codes = match codes {
        Some(codes) if !codes.is_empty() => codes,
        _ => vec![generate_voucher_code(pool).await?],
    };

    let mut created = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim();
        if code.is_empty() {
            return Err(DiscountError::InvalidInput("voucher code must not be empty".into()));
        }
        created.push(voucher_code::create(pool, voucher_id, code).await?);
    }
    tracing::info!(voucher_id, count = created.len(), "Voucher codes created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::channel;
    use shared::models::{
        ChannelCreate, DiscountValueType, VoucherChannelListingCreate, VoucherCreate, VoucherType,
    };

    const NOW: i64 = 1_700_000_000_000;

    async fn setup(usage_limit: Option<i64>, end_date: Option<i64>) -> (DbService, Voucher) {
        let db = DbService::in_memory().await.unwrap();
        let ch = channel::create(
            &db.pool,
            ChannelCreate {
                name: "Default".to_string(),
                slug: "default".to_string(),
                currency_code: "USD".to_string(),
                is_active: None,
                include_draft_order_in_voucher_usage: None,
                prices_entered_with_tax: None,
            },
        )
        .await
        .unwrap();
        let v = voucher::create(
            &db.pool,
            VoucherCreate {
                name: Some("Ten off".to_string()),
                voucher_type: VoucherType::EntireOrder,
                discount_value_type: DiscountValueType::Fixed,
                usage_limit,
                single_use: None,
                apply_once_per_order: None,
                apply_once_per_customer: None,
                only_for_staff: None,
                min_checkout_items_quantity: None,
                start_date: Some(NOW - 1_000),
                end_date,
            },
        )
        .await
        .unwrap();
        voucher::upsert_channel_listing(
            &db.pool,
            v.id,
            VoucherChannelListingCreate {
                channel_id: ch.id,
                discount_value: 10.0,
                currency: "USD".to_string(),
                min_spent_amount: None,
            },
        )
        .await
        .unwrap();
        (db, v)
    }

    #[tokio::test]
    async fn test_code_instance_found() {
        let (db, v) = setup(None, None).await;
        create_voucher_codes(&db.pool, v.id, Some(vec!["TENOFF".to_string()]))
            .await
            .unwrap();
        let code = get_voucher_code_instance(&db.pool, "TENOFF", "default", NOW)
            .await
            .unwrap();
        assert_eq!(code.voucher_id, v.id);
    }

    #[tokio::test]
    async fn test_code_instance_rejections() {
        let (db, v) = setup(None, Some(NOW + 1_000)).await;
        let codes = create_voucher_codes(&db.pool, v.id, Some(vec!["TENOFF".to_string()]))
            .await
            .unwrap();

        // unknown code, other channel, before start, after end
        for (code, slug, now) in [
            ("NOPE", "default", NOW),
            ("TENOFF", "other", NOW),
            ("TENOFF", "default", NOW - 5_000),
            ("TENOFF", "default", NOW + 5_000),
        ] {
            let err = get_voucher_code_instance(&db.pool, code, slug, now)
                .await
                .unwrap_err();
            assert!(matches!(err, DiscountError::InvalidPromoCode));
        }

        // inactive code
        voucher_code::set_active(&db.pool, codes[0].id, false).await.unwrap();
        assert!(get_voucher_code_instance(&db.pool, "TENOFF", "default", NOW).await.is_err());
    }

    #[tokio::test]
    async fn test_usage_limit_exhausted() {
        let (db, v) = setup(Some(1), None).await;
        let codes = create_voucher_codes(&db.pool, v.id, Some(vec!["ONCE".to_string()]))
            .await
            .unwrap();
        voucher_code::increment_used(&db.pool, codes[0].id).await.unwrap();
        assert!(get_voucher_code_instance(&db.pool, "ONCE", "default", NOW).await.is_err());
        assert!(get_active_voucher_code(&db.pool, &v, "default", NOW).await.is_err());
    }

    #[tokio::test]
    async fn test_active_voucher_code_first_active() {
        let (db, v) = setup(None, None).await;
        let codes = create_voucher_codes(
            &db.pool,
            v.id,
            Some(vec!["FIRST".to_string(), "SECOND".to_string()]),
        )
        .await
        .unwrap();
        voucher_code::set_active(&db.pool, codes[0].id, false).await.unwrap();

        let code = get_active_voucher_code(&db.pool, &v, "default", NOW).await.unwrap();
        assert_eq!(code.code, "SECOND");
    }

    #[tokio::test]
    async fn test_generated_code_shape() {
        let (db, v) = setup(None, None).await;
        let codes = create_voucher_codes(&db.pool, v.id, None).await.unwrap();
        assert_eq!(codes.len(), 1);
        let code = &codes[0].code;
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let (db, v) = setup(None, None).await;
        create_voucher_codes(&db.pool, v.id, Some(vec!["DUP".to_string()]))
            .await
            .unwrap();
        let err = create_voucher_codes(&db.pool, v.id, Some(vec!["DUP".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscountError::Repo(RepoError::Duplicate(_))));
    }
}
