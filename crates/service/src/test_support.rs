#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use configs::DatabaseConfig;
use models::db::connect_with_config;

// Ensure the schema is provisioned only once across the entire test process
static PROVISIONED: OnceCell<()> = OnceCell::const_new();

/// `None` when DB tests are disabled or no `DATABASE_URL` is available.
pub fn db_config() -> Option<DatabaseConfig> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let _ = dotenvy::dotenv();
    let mut cfg = DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.min_connections = 1;
    cfg.validate().ok().map(|_| cfg)
}

pub async fn get_db(cfg: &DatabaseConfig) -> Result<DatabaseConnection, anyhow::Error> {
    PROVISIONED
        .get_or_init(|| async {
            let db = connect_with_config(cfg).await.expect("connect db for schema");
            db.execute_unprepared(models::stock::SCHEMA_SQL).await.expect("create stocks table");
            drop(db);
        })
        .await;

    // Return a fresh pool for the current test's runtime
    let db = connect_with_config(cfg).await?;
    Ok(db)
}
