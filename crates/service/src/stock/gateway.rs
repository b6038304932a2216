use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use tracing::{debug, error, instrument};

use models::stock::{self, Entity as StockEntity, StockEntry};

use crate::errors::ServiceError;

/// Result of a lookup by id. Storage failures travel on the `Err` side.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(StockEntry),
    NotFound,
}

/// Typed CRUD primitives over the `stocks` table.
///
/// Implementations hold no per-request state; each call borrows a connection
/// only for the duration of its own statement.
#[async_trait]
pub trait StockGateway: Send + Sync {
    /// Insert name, price, company and both timestamps; returns the id storage assigned.
    async fn insert(&self, entry: &StockEntry) -> Result<i64, ServiceError>;
    async fn fetch_all(&self) -> Result<Vec<StockEntry>, ServiceError>;
    async fn fetch_by_id(&self, id: i64) -> Result<FetchOutcome, ServiceError>;
    /// Write every business column keyed by `entry.id`; returns that id.
    async fn update(&self, entry: &StockEntry) -> Result<i64, ServiceError>;
    /// Remove the row keyed by `entry.id`; returns that id.
    async fn delete(&self, entry: &StockEntry) -> Result<i64, ServiceError>;
}

/// SeaORM-backed gateway over the process-wide connection pool.
pub struct SeaOrmStockGateway {
    db: DatabaseConnection,
    timeout: Duration,
}

impl SeaOrmStockGateway {
    pub fn new(db: DatabaseConnection, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

fn map_db_err(op: &'static str, e: DbErr) -> ServiceError {
    match e {
        DbErr::RecordNotUpdated => ServiceError::not_found("stock"),
        other => {
            error!(op, error = %other, "storage statement failed");
            ServiceError::Storage(other.to_string())
        }
    }
}

/// Run one storage future under a deadline. Dropping the future on expiry
/// returns its pooled connection.
pub(crate) async fn bounded<T, F>(op: &'static str, timeout: Duration, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res.map_err(|e| map_db_err(op, e)),
        Err(_) => {
            error!(op, timeout_ms = timeout.as_millis() as u64, "storage call timed out");
            Err(ServiceError::Timeout(timeout))
        }
    }
}

#[async_trait]
impl StockGateway for SeaOrmStockGateway {
    #[instrument(skip_all, fields(name = %entry.name))]
    async fn insert(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        let created = bounded("insert", self.timeout, entry.to_insert_model().insert(&self.db)).await?;
        debug!(stock_id = created.id, "stock inserted");
        Ok(created.id)
    }

    #[instrument(skip_all)]
    async fn fetch_all(&self) -> Result<Vec<StockEntry>, ServiceError> {
        let rows = bounded(
            "fetch_all",
            self.timeout,
            StockEntity::find().order_by_asc(stock::Column::Id).all(&self.db),
        )
        .await?;
        debug!(count = rows.len(), "stocks fetched");
        Ok(rows.into_iter().map(StockEntry::from).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, id: i64) -> Result<FetchOutcome, ServiceError> {
        let found = bounded("fetch_by_id", self.timeout, StockEntity::find_by_id(id).one(&self.db)).await?;
        Ok(match found {
            Some(m) => FetchOutcome::Found(m.into()),
            None => FetchOutcome::NotFound,
        })
    }

    #[instrument(skip_all, fields(stock_id = entry.id))]
    async fn update(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        let updated = bounded("update", self.timeout, entry.to_update_model().update(&self.db)).await?;
        Ok(updated.id)
    }

    #[instrument(skip_all, fields(stock_id = entry.id))]
    async fn delete(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        let res = bounded("delete", self.timeout, StockEntity::delete_by_id(entry.id).exec(&self.db)).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("stock"));
        }
        Ok(entry.id)
    }
}
