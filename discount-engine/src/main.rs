use discount_engine::{DiscountService, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    let config = setup_environment()?;

    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Discount engine starting..."
    );

    // 2. 打开数据库并应用迁移
    let service = match DiscountService::initialize(&config).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to initialize discount engine: {}", e);
            return Err(e.into());
        }
    };

    let vouchers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voucher")
        .fetch_one(service.pool())
        .await?;
    tracing::info!(
        database = %config.database_path,
        vouchers,
        "Discount engine ready"
    );

    service.db.pool.close().await;
    Ok(())
}
