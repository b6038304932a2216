//! In-memory `StockGateway` for handler tests and doc examples.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use models::stock::StockEntry;

use super::gateway::{FetchOutcome, StockGateway};
use crate::errors::ServiceError;

/// Number of times each gateway operation was invoked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallLog {
    pub insert: usize,
    pub fetch_all: usize,
    pub fetch_by_id: usize,
    pub update: usize,
    pub delete: usize,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.insert + self.fetch_all + self.fetch_by_id + self.update + self.delete
    }

    fn bump(&mut self, op: StockOp) {
        match op {
            StockOp::Insert => self.insert += 1,
            StockOp::FetchAll => self.fetch_all += 1,
            StockOp::FetchById => self.fetch_by_id += 1,
            StockOp::Update => self.update += 1,
            StockOp::Delete => self.delete += 1,
        }
    }
}

/// Gateway operation a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockOp {
    Insert,
    FetchAll,
    FetchById,
    Update,
    Delete,
}

/// Failure injected into one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Storage,
    Timeout,
}

impl Fault {
    fn into_error(self) -> ServiceError {
        match self {
            Fault::Storage => ServiceError::Storage("connection refused".into()),
            Fault::Timeout => ServiceError::Timeout(Duration::from_secs(10)),
        }
    }
}

/// Ids are assigned sequentially from 1, like a `BIGSERIAL` column.
///
/// # Examples
/// ```
/// use service::stock::{mock::InMemoryStockGateway, StockGateway};
/// use models::stock::StockEntry;
/// let gw = InMemoryStockGateway::default();
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let id = rt.block_on(gw.insert(&StockEntry { name: "ACME".into(), ..Default::default() })).unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(gw.calls().insert, 1);
/// ```
#[derive(Default)]
pub struct InMemoryStockGateway {
    rows: Mutex<BTreeMap<i64, StockEntry>>,
    inserted: Mutex<Vec<StockEntry>>,
    calls: Mutex<CallLog>,
    faults: Mutex<HashMap<StockOp, Fault>>,
    next_id: AtomicI64,
    fail_storage: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStockGateway {
    /// Store `entry` directly, bypassing the call log. Returns the new id.
    pub fn seed(&self, mut entry: StockEntry) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        entry.id = id;
        lock(&self.rows).insert(id, entry);
        id
    }

    pub fn get(&self, id: i64) -> Option<StockEntry> {
        lock(&self.rows).get(&id).cloned()
    }

    pub fn calls(&self) -> CallLog {
        *lock(&self.calls)
    }

    /// Entries exactly as handed to `insert`, in call order.
    pub fn inserted(&self) -> Vec<StockEntry> {
        lock(&self.inserted).clone()
    }

    /// Make every following call fail with `ServiceError::Storage`.
    pub fn set_fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    /// Make only `op` fail, leaving the other operations working.
    pub fn fail_on(&self, op: StockOp, fault: Fault) {
        lock(&self.faults).insert(op, fault);
    }

    fn record(&self, op: StockOp) -> Result<(), ServiceError> {
        lock(&self.calls).bump(op);
        let fault = lock(&self.faults)
            .get(&op)
            .copied()
            .or_else(|| self.fail_storage.load(Ordering::SeqCst).then_some(Fault::Storage));
        match fault {
            Some(f) => Err(f.into_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StockGateway for InMemoryStockGateway {
    async fn insert(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        self.record(StockOp::Insert)?;
        lock(&self.inserted).push(entry.clone());
        Ok(self.seed(entry.clone()))
    }

    async fn fetch_all(&self) -> Result<Vec<StockEntry>, ServiceError> {
        self.record(StockOp::FetchAll)?;
        Ok(lock(&self.rows).values().cloned().collect())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<FetchOutcome, ServiceError> {
        self.record(StockOp::FetchById)?;
        Ok(match self.get(id) {
            Some(e) => FetchOutcome::Found(e),
            None => FetchOutcome::NotFound,
        })
    }

    async fn update(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        self.record(StockOp::Update)?;
        let mut rows = lock(&self.rows);
        match rows.get_mut(&entry.id) {
            Some(row) => {
                *row = entry.clone();
                Ok(entry.id)
            }
            None => Err(ServiceError::not_found("stock")),
        }
    }

    async fn delete(&self, entry: &StockEntry) -> Result<i64, ServiceError> {
        self.record(StockOp::Delete)?;
        match lock(&self.rows).remove(&entry.id) {
            Some(_) => Ok(entry.id),
            None => Err(ServiceError::not_found("stock")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> StockEntry {
        StockEntry { name: name.into(), price: 1.0, company: "C".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_calls_counted() {
        let gw = InMemoryStockGateway::default();
        assert_eq!(gw.insert(&entry("A")).await.unwrap(), 1);
        assert_eq!(gw.insert(&entry("B")).await.unwrap(), 2);
        let all = gw.fetch_all().await.unwrap();
        assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(gw.calls(), CallLog { insert: 2, fetch_all: 1, ..Default::default() });
        assert_eq!(gw.inserted()[1].name, "B");
    }

    #[tokio::test]
    async fn update_and_delete_missing_rows() {
        let gw = InMemoryStockGateway::default();
        let mut e = entry("A");
        e.id = 42;
        assert!(matches!(gw.update(&e).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(gw.delete(&e).await, Err(ServiceError::NotFound(_))));
        assert_eq!(gw.fetch_by_id(42).await.unwrap(), FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn failure_switch_still_records_calls() {
        let gw = InMemoryStockGateway::default();
        gw.seed(entry("A"));
        gw.set_fail_storage(true);
        assert!(gw.fetch_all().await.unwrap_err().is_storage());
        assert_eq!(gw.calls().total(), 1);
        gw.set_fail_storage(false);
        assert!(matches!(gw.fetch_by_id(1).await.unwrap(), FetchOutcome::Found(e) if e.name == "A"));
    }

    #[tokio::test]
    async fn fault_hits_only_the_chosen_operation() {
        let gw = InMemoryStockGateway::default();
        let id = gw.seed(entry("A"));
        gw.fail_on(StockOp::Delete, Fault::Timeout);
        let found = match gw.fetch_by_id(id).await.unwrap() {
            FetchOutcome::Found(e) => e,
            FetchOutcome::NotFound => panic!("seeded row missing"),
        };
        assert!(matches!(gw.delete(&found).await, Err(ServiceError::Timeout(_))));
        assert!(gw.get(id).is_some());
        assert_eq!(gw.calls(), CallLog { fetch_by_id: 1, delete: 1, ..Default::default() });
    }
}
