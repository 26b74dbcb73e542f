use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Body of `POST /product`. The owner is never read from the body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
}
