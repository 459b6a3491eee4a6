//! Customer Account Repository

use super::RepoResult;
use shared::models::User;
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, is_staff, created_at FROM account_user WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, email: &str, is_staff: bool) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, User>(
        "INSERT INTO account_user (email, is_staff, created_at) VALUES (?1, ?2, ?3) RETURNING id, email, is_staff, created_at",
    )
    .bind(email)
    .bind(is_staff)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
