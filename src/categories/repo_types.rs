use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Record, Value};

/// Category record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color_hex: String,
    pub user_id: Uuid, // owner
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub color_hex: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color_hex: Option<String>,
}

impl Record for Category {
    const TABLE: &'static str = "categories";
    const KIND: &'static str = "Category";

    type New = NewCategory;
    type Patch = CategoryPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert_columns(new: &NewCategory) -> Vec<(&'static str, Value)> {
        vec![
            ("name", new.name.clone().into()),
            ("color_hex", new.color_hex.clone().into()),
            ("user_id", new.user_id.into()),
        ]
    }

    fn patch_columns(patch: &CategoryPatch) -> Vec<(&'static str, Value)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", name.clone().into()));
        }
        if let Some(color_hex) = &patch.color_hex {
            columns.push(("color_hex", color_hex.clone().into()));
        }
        columns
    }

    fn build(id: Uuid, now: OffsetDateTime, new: NewCategory) -> Self {
        Self {
            id,
            name: new.name,
            color_hex: new.color_hex,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: CategoryPatch, now: OffsetDateTime) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color_hex) = patch.color_hex {
            self.color_hex = color_hex;
        }
        self.updated_at = now;
    }

    fn column(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "color_hex" => self.color_hex.clone().into(),
            "user_id" => self.user_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}
