use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use configs::{DatabaseConfig, IdPolicy};
use reqwest::StatusCode as HttpStatusCode;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};
use server::routes::{self, ServerState};
use service::stock::SeaOrmStockGateway;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

struct TestApp {
    base_url: String,
}

async fn start_server() -> anyhow::Result<TestApp> {
    // Use DATABASE_URL from environment; if not present, skip tests gracefully
    let _ = dotenvy::dotenv();
    let mut cfg = DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.min_connections = 1;
    if cfg.validate().is_err() {
        eprintln!("DATABASE_URL missing; skip e2e tests. Provide .env or env var.");
        return Err(anyhow::anyhow!("missing DATABASE_URL"));
    }

    let db = models::db::connect_with_config(&cfg).await?;
    db.execute_unprepared(models::stock::SCHEMA_SQL).await?;

    let gateway = SeaOrmStockGateway::new(db, Duration::from_secs(10));
    let state = ServerState::new(Arc::new(gateway), IdPolicy::Storage);
    let app = routes::build_router(state, CorsLayer::very_permissive());

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url: format!("http://{}:{}", addr.ip(), addr.port()) })
}

async fn body(res: reqwest::Response) -> anyhow::Result<Value> {
    assert_eq!(res.status(), HttpStatusCode::OK);
    Ok(res.json::<Value>().await?)
}

#[tokio::test]
async fn e2e_stock_lifecycle() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = match start_server().await {
        Ok(a) => a,
        Err(_) => return Ok(()),
    };
    let c = reqwest::Client::new();
    let stocks = format!("{}/api/v1/stocks", app.base_url);

    // Create: storage assigns the id
    let created = body(c.post(&stocks)
        .json(&json!({"stockId": 0, "name": "ACME", "price": 10.5, "company": "Acme Inc"}))
        .send().await?).await?;
    assert_eq!(created["message"], "Stock created successfully");
    let id = created["id"].as_i64().expect("assigned id");
    assert!(id > 0);
    let one = format!("{}/{}", stocks, id);

    // Get
    let fetched = body(c.get(&one).send().await?).await?;
    assert_eq!(fetched["id"], id);
    assert_eq!(fetched["data"]["name"], "ACME");
    let created_at = fetched["data"]["createdAt"].clone();

    // Update merges
    let updated = body(c.put(&one).json(&json!({"price": 2})).send().await?).await?;
    assert_eq!(updated["id"], id);
    let fetched = body(c.get(&one).send().await?).await?;
    assert_eq!(fetched["data"]["price"], 2.0);
    assert_eq!(fetched["data"]["company"], "Acme Inc");
    assert_eq!(fetched["data"]["createdAt"], created_at);
    assert_ne!(fetched["data"]["updatedAt"], created_at);

    // List contains it
    let listed = body(c.get(&stocks).send().await?).await?;
    let ids: Vec<i64> = listed["data"].as_array().unwrap().iter().filter_map(|e| e["stockId"].as_i64()).collect();
    assert!(ids.contains(&id));

    // Delete then Get
    let deleted = body(c.delete(&one).send().await?).await?;
    assert_eq!(deleted, json!({"id": id, "message": "Stock deleted successfully"}));
    let gone = body(c.get(&one).send().await?).await?;
    assert_eq!(gone, json!({"message": "Stock not found"}));
    Ok(())
}
