use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::RepoResult;
use sqlx::SqlitePool;

/// 服务状态 - 持有数据库连接和配置
///
/// Clone 成本低 (连接池内部是 Arc)。
#[derive(Clone)]
pub struct DiscountService {
    pub config: Config,
    pub db: DbService,
}

impl DiscountService {
    /// 打开数据库并应用迁移
    pub async fn initialize(config: &Config) -> RepoResult<Self> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::db::repository::RepoError::Database(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let db = DbService::new(&config.database_path, config.db_max_connections).await?;
        Ok(Self {
            config: config.clone(),
            db,
        })
    }

    /// In-memory service for tests and tooling
    pub async fn in_memory(config: Config) -> RepoResult<Self> {
        let db = DbService::in_memory().await?;
        Ok(Self { config, db })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_overrides(dir.path().to_string_lossy());
        config.database_path = dir
            .path()
            .join("nested/discounts.db")
            .to_string_lossy()
            .into_owned();

        let service = DiscountService::initialize(&config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voucher_code")
            .fetch_one(service.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(std::path::Path::new(&config.database_path).exists());
    }

    #[tokio::test]
    async fn test_in_memory_service_keeps_config() {
        let config = Config::with_overrides("/tmp/discount-engine-test");
        let service = DiscountService::in_memory(config).await.unwrap();
        assert_eq!(service.config.work_dir, "/tmp/discount-engine-test");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(service.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
