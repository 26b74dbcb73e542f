use serde::Deserialize;

use crate::store::{Filter, Order, PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE};

pub const MAX_LIMIT: u64 = 100;
/// Highest page whose offset still fits a signed 64-bit OFFSET at `MAX_LIMIT`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// `?page=&limit=&name=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub name: Option<String>,
}

/// Coerced listing parameters: `1 <= page <= MAX_PAGE`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub name: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT, name: None }
    }
}

impl From<ListQuery> for ListParams {
    fn from(q: ListQuery) -> Self {
        Self {
            page: q.page.map_or(DEFAULT_PAGE, |p| (p.max(1) as u64).min(MAX_PAGE)),
            limit: q.limit.map_or(DEFAULT_LIMIT, |l| (l.max(1) as u64).min(MAX_LIMIT)),
            name: q.name.filter(|n| !n.trim().is_empty()),
        }
    }
}

impl ListParams {
    /// Exact-name filter, newest first.
    pub fn into_page_request(self) -> PageRequest {
        let filter = match self.name {
            Some(name) => Filter::new().eq("name", name),
            None => Filter::new(),
        };
        PageRequest {
            page: self.page,
            limit: self.limit,
            filter,
            order: Order::newest(),
        }
    }
}
