use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use super::{
    Direction, Filter, Operation, Order, PageMeta, PageRequest, Paginated, Record, RecordStore,
    StoreError, Value,
};

/// PostgreSQL-backed [`RecordStore`]. Column names only ever come from
/// [`Record`] impls; every value goes through a bind parameter.
pub struct PgRecordStore<R> {
    db: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for PgRecordStore<R> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), _record: PhantomData }
    }
}

impl<R: Record> PgRecordStore<R> {
    pub fn new(db: PgPool) -> Self {
        Self { db, _record: PhantomData }
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: Value) {
    match value {
        Value::Null => qb.push("NULL"),
        Value::Text(v) => qb.push_bind(v),
        Value::Uuid(v) => qb.push_bind(v),
        Value::Decimal(v) => qb.push_bind(v),
        Value::Timestamp(v) => qb.push_bind(v),
    };
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    for (i, (column, value)) in filter.conditions().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(*column);
        if *value == Value::Null {
            qb.push(" IS NULL");
        } else {
            qb.push(" = ");
            push_value(qb, value.clone());
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'static, Postgres>, order: Order) {
    qb.push(" ORDER BY ").push(order.column);
    qb.push(match order.direction {
        Direction::Asc => " ASC",
        Direction::Desc => " DESC",
    });
    // keeps pages stable when the sort column ties
    qb.push(", id ASC");
}

pub(crate) fn insert_query<R: Record>(id: Uuid, new: &R::New) -> QueryBuilder<'static, Postgres> {
    let columns = R::insert_columns(new);
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(R::TABLE).push(" (id");
    for (column, _) in &columns {
        qb.push(", ").push(*column);
    }
    qb.push(") VALUES (");
    qb.push_bind(id);
    for (_, value) in columns {
        qb.push(", ");
        push_value(&mut qb, value);
    }
    qb.push(") RETURNING *");
    qb
}

pub(crate) fn select_query<R: Record>(
    filter: &Filter,
    order: Option<Order>,
    limit: Option<u64>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM ");
    qb.push(R::TABLE);
    push_where(&mut qb, filter);
    if let Some(order) = order {
        push_order(&mut qb, order);
    }
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit as i64);
    }
    qb
}

pub(crate) fn update_query<R: Record>(id: Uuid, patch: &R::Patch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(R::TABLE).push(" SET ");
    for (column, value) in R::patch_columns(patch) {
        qb.push(column).push(" = ");
        push_value(&mut qb, value);
        qb.push(", ");
    }
    qb.push("updated_at = now() WHERE id = ").push_bind(id);
    qb.push(" RETURNING *");
    qb
}

pub(crate) fn count_query<R: Record>(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(R::TABLE);
    push_where(&mut qb, filter);
    qb
}

pub(crate) fn page_query<R: Record>(request: &PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT *, COUNT(*) OVER () AS total_count FROM ");
    qb.push(R::TABLE);
    push_where(&mut qb, &request.filter);
    push_order(&mut qb, request.order);
    qb.push(" LIMIT ").push_bind(request.limit as i64);
    let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
    qb.push(" OFFSET ").push_bind(offset);
    qb
}

#[async_trait]
impl<R: Record> RecordStore<R> for PgRecordStore<R> {
    async fn create(&self, new: R::New) -> Result<R, StoreError> {
        let id = Uuid::new_v4();
        let record = insert_query::<R>(id, &new)
            .build_query_as::<R>()
            .fetch_one(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Create, e))?;
        debug!(table = R::TABLE, %id, "record created");
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, StoreError> {
        select_query::<R>(&Filter::new().eq("id", id), None, None)
            .build_query_as::<R>()
            .fetch_optional(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::FindById, e))
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<R>, StoreError> {
        select_query::<R>(filter, Some(Order::default()), Some(1))
            .build_query_as::<R>()
            .fetch_optional(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::FindOne, e))
    }

    async fn find(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::MissingFilter { op: Operation::Find });
        }
        select_query::<R>(filter, Some(order), None)
            .build_query_as::<R>()
            .fetch_all(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Find, e))
    }

    async fn find_all(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError> {
        select_query::<R>(filter, Some(order), None)
            .build_query_as::<R>()
            .fetch_all(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::FindAll, e))
    }

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R>, StoreError> {
        let updated = update_query::<R>(id, &patch)
            .build_query_as::<R>()
            .fetch_optional(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Update, e))?;
        debug!(table = R::TABLE, %id, found = updated.is_some(), "record update");
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(R::TABLE).push(" WHERE id = ").push_bind(id);
        let result = qb
            .build()
            .execute(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Delete, e))?;
        debug!(table = R::TABLE, %id, rows = result.rows_affected(), "record delete");
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let count = count_query::<R>(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Count, e))?;
        Ok(count.max(0) as u64)
    }

    async fn paginate(&self, request: PageRequest) -> Result<Paginated<R>, StoreError> {
        let rows = page_query::<R>(&request)
            .build()
            .fetch_all(&self.db)
            .await
            .map_err(|e| StoreError::from_sqlx(Operation::Paginate, e))?;

        let total = match rows.first() {
            Some(row) => row
                .try_get::<i64, _>("total_count")
                .map_err(|e| StoreError::from_sqlx(Operation::Paginate, e))?
                .max(0) as u64,
            // a page past the end returns no rows, so the window count is lost
            None if request.page > 1 => self
                .count(&request.filter)
                .await
                .map_err(|e| e.within(Operation::Paginate))?,
            None => 0,
        };

        let data = rows
            .iter()
            .map(R::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::from_sqlx(Operation::Paginate, e))?;

        Ok(Paginated {
            data,
            pagination: PageMeta::new(request.page, request.limit, total),
        })
    }
}
