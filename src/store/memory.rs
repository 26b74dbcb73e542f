use std::cmp::Ordering;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    Direction, Filter, Operation, Order, PageMeta, PageRequest, Paginated, Record, RecordStore,
    StoreError,
};

/// In-process [`RecordStore`] keeping records in insertion order.
pub struct MemoryRecordStore<R> {
    records: RwLock<Vec<R>>,
}

impl<R> Default for MemoryRecordStore<R> {
    fn default() -> Self {
        Self { records: RwLock::new(Vec::new()) }
    }
}

impl<R: Record> MemoryRecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare<R: Record>(a: &R, b: &R, order: Order) -> Ordering {
    let left = a.column(order.column);
    let right = b.column(order.column);
    let ord = match (left, right) {
        (Some(l), Some(r)) => l.compare(&r),
        _ => Ordering::Equal,
    };
    match order.direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}

fn select<R: Record>(records: &[R], filter: &Filter, order: Order) -> Vec<R> {
    let mut out: Vec<R> = records.iter().filter(|r| filter.matches(*r)).cloned().collect();
    out.sort_by(|a, b| compare(a, b, order).then_with(|| a.id().cmp(&b.id())));
    out
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryRecordStore<R> {
    async fn create(&self, new: R::New) -> Result<R, StoreError> {
        let mut records = self.records.write().await;
        for (column, value) in R::insert_columns(&new) {
            if !R::UNIQUE.contains(&column) {
                continue;
            }
            if records.iter().any(|r| r.column(column).as_ref() == Some(&value)) {
                return Err(StoreError::Persistence {
                    op: Operation::Create,
                    message: format!(
                        "duplicate key value violates unique constraint \"{}_{}_key\"",
                        R::TABLE,
                        column
                    ),
                });
            }
        }
        let record = R::build(Uuid::new_v4(), OffsetDateTime::now_utc(), new);
        debug!(table = R::TABLE, id = %record.id(), "record created");
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<R>, StoreError> {
        let records = self.records.read().await;
        Ok(select(&records, filter, Order::default()).into_iter().next())
    }

    async fn find(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::MissingFilter { op: Operation::Find });
        }
        let records = self.records.read().await;
        Ok(select(&records, filter, order))
    }

    async fn find_all(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError> {
        let records = self.records.read().await;
        Ok(select(&records, filter, order))
    }

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let mut records = self.records.write().await;
        if !records.iter().any(|r| r.id() == id) {
            return Ok(None);
        }
        for (column, value) in R::patch_columns(&patch) {
            if R::UNIQUE.contains(&column)
                && records
                    .iter()
                    .any(|r| r.id() != id && r.column(column).as_ref() == Some(&value))
            {
                return Err(StoreError::Persistence {
                    op: Operation::Update,
                    message: format!(
                        "duplicate key value violates unique constraint \"{}_{}_key\"",
                        R::TABLE,
                        column
                    ),
                });
            }
        }
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        record.apply(patch, OffsetDateTime::now_utc());
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(records.len() < before)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(*r)).count() as u64)
    }

    async fn paginate(&self, request: PageRequest) -> Result<Paginated<R>, StoreError> {
        let records = self.records.read().await;
        let matching = select(&records, &request.filter, request.order);
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Ok(Paginated {
            data,
            pagination: PageMeta::new(request.page, request.limit, total),
        })
    }
}
