use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Record, Value};

/// Product record in the database. `price` is NUMERIC(10,2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub user_id: Uuid,
    pub category_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub user_id: Uuid,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
}

impl Record for Product {
    const TABLE: &'static str = "products";
    const KIND: &'static str = "Product";

    type New = NewProduct;
    type Patch = ProductPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert_columns(new: &NewProduct) -> Vec<(&'static str, Value)> {
        vec![
            ("name", new.name.clone().into()),
            ("description", new.description.clone().into()),
            ("price", new.price.into()),
            ("user_id", new.user_id.into()),
            ("category_id", new.category_id.into()),
        ]
    }

    fn patch_columns(patch: &ProductPatch) -> Vec<(&'static str, Value)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", name.clone().into()));
        }
        if let Some(description) = &patch.description {
            columns.push(("description", description.clone().into()));
        }
        if let Some(price) = patch.price {
            columns.push(("price", price.into()));
        }
        if let Some(category_id) = patch.category_id {
            columns.push(("category_id", category_id.into()));
        }
        columns
    }

    fn build(id: Uuid, now: OffsetDateTime, new: NewProduct) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            user_id: new.user_id,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: ProductPatch, now: OffsetDateTime) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        self.updated_at = now;
    }

    fn column(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "description" => self.description.clone().into(),
            "price" => self.price.into(),
            "user_id" => self.user_id.into(),
            "category_id" => self.category_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_serializes_without_float_rounding() {
        let now = OffsetDateTime::now_utc();
        let product = Product::build(
            Uuid::new_v4(),
            now,
            NewProduct {
                name: "Hammer".into(),
                description: None,
                price: Decimal::new(1999, 2),
                user_id: Uuid::new_v4(),
                category_id: Uuid::new_v4(),
            },
        );
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], "19.99");
        assert!(json.get("categoryId").is_some());
    }
}
