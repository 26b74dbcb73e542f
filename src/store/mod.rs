//! Generic record store shared by every entity service.
//!
//! A [`RecordStore`] is bound to exactly one [`Record`] type. Absence is
//! reported as data (`None` / `false`), never as an error; every real failure
//! is a [`StoreError`] carrying the operation it happened in.

use std::{cmp::Ordering, fmt};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// A persisted entity the store knows how to read, write and filter.
pub trait Record: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    /// Table name; also used as the in-memory collection label.
    const TABLE: &'static str;
    /// Human-facing entity name used in error messages.
    const KIND: &'static str;
    /// Columns whose values must be unique across the collection.
    const UNIQUE: &'static [&'static str] = &[];

    type New: Send + Sync + 'static;
    type Patch: Send + Sync + 'static;

    fn id(&self) -> Uuid;

    /// Column/value pairs written on insert (without `id` and timestamps).
    fn insert_columns(new: &Self::New) -> Vec<(&'static str, Value)>;

    /// Column/value pairs changed by a partial update. Unset fields are omitted.
    fn patch_columns(patch: &Self::Patch) -> Vec<(&'static str, Value)>;

    /// Builds the stored shape of a freshly created record.
    fn build(id: Uuid, now: OffsetDateTime, new: Self::New) -> Self;

    /// Merges a patch into an existing record.
    fn apply(&mut self, patch: Self::Patch, now: OffsetDateTime);

    /// Reads a column by name, `None` for unknown columns.
    fn column(&self, name: &str) -> Option<Value>;
}

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Uuid(Uuid),
    Decimal(Decimal),
    Timestamp(OffsetDateTime),
}

impl Value {
    /// Orders two values of the same kind; mixed kinds compare equal.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Conjunction of column equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(&'static str, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(&'static str, Value)] {
        &self.conditions
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| record.column(column).as_ref() == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

impl Order {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, direction: Direction::Asc }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, direction: Direction::Desc }
    }

    /// Newest first.
    pub const fn newest() -> Self {
        Self::desc("created_at")
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::asc("created_at")
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub filter: Filter,
    pub order: Order,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            filter: Filter::default(),
            order: Order::default(),
        }
    }
}

impl PageRequest {
    /// Rows to skip; saturates instead of overflowing on absurd pages.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(page: u64, limit: u64, total_items: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total_items.div_ceil(limit) };
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

/// Store operation, rendered as the context prefix of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    FindById,
    FindOne,
    Find,
    FindAll,
    Update,
    Delete,
    Count,
    Paginate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "creating record",
            Operation::FindById => "finding record by ID",
            Operation::FindOne => "finding one record",
            Operation::Find => "finding records",
            Operation::FindAll => "finding all records",
            Operation::Update => "updating record",
            Operation::Delete => "deleting record",
            Operation::Count => "counting records",
            Operation::Paginate => "in pagination",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected the operation (constraint violation, bad data, ...).
    #[error("Error {op}: {message}")]
    Persistence { op: Operation, message: String },

    /// No connection could be obtained or the connection broke.
    #[error("Error {op}: store unavailable: {message}")]
    Unavailable { op: Operation, message: String },

    #[error("Error {op}: a non-empty filter is required")]
    MissingFilter { op: Operation },
}

impl StoreError {
    pub fn from_sqlx(op: Operation, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable { op, message: err.to_string() }
            }
            sqlx::Error::Database(db) => StoreError::Persistence {
                op,
                message: db.message().to_string(),
            },
            other => StoreError::Persistence { op, message: other.to_string() },
        }
    }

    /// Same failure, reported under `op`.
    pub fn within(self, op: Operation) -> Self {
        match self {
            StoreError::Persistence { message, .. } => StoreError::Persistence { op, message },
            StoreError::Unavailable { message, .. } => StoreError::Unavailable { op, message },
            StoreError::MissingFilter { .. } => StoreError::MissingFilter { op },
        }
    }
}

/// Uniform CRUD and pagination over one record type.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn create(&self, new: R::New) -> Result<R, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<R>, StoreError>;

    /// Like [`RecordStore::find_all`] but refuses an empty filter.
    async fn find(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError>;

    async fn find_all(&self, filter: &Filter, order: Order) -> Result<Vec<R>, StoreError>;

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn paginate(&self, request: PageRequest) -> Result<Paginated<R>, StoreError>;
}
