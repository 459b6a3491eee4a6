//! Product ↔ Collection membership

use super::RepoResult;
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Collection ids per product, for the given products
pub async fn find_for_products(
    pool: &SqlitePool,
    product_ids: &[i64],
) -> RepoResult<HashMap<i64, Vec<i64>>> {
    let mut result: HashMap<i64, Vec<i64>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(result);
    }

    let placeholders = vec!["?"; product_ids.len()].join(", ");
    let sql = format!(
        "SELECT product_id, collection_id FROM product_collection WHERE product_id IN ({placeholders}) ORDER BY collection_id"
    );
    let mut query = sqlx::query_as::<_, (i64, i64)>(&sql);
    for id in product_ids {
        query = query.bind(*id);
    }

    for (product_id, collection_id) in query.fetch_all(pool).await? {
        result.entry(product_id).or_default().push(collection_id);
    }
    Ok(result)
}

pub async fn add(pool: &SqlitePool, product_id: i64, collection_id: i64) -> RepoResult<()> {
    sqlx::query("INSERT OR IGNORE INTO product_collection (product_id, collection_id) VALUES (?1, ?2)")
        .bind(product_id)
        .bind(collection_id)
        .execute(pool)
        .await?;
    Ok(())
}
