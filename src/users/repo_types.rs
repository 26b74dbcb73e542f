use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Record, Value};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String, // unique, lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const KIND: &'static str = "User";
    const UNIQUE: &'static [&'static str] = &["email"];

    type New = NewUser;
    type Patch = UserPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn insert_columns(new: &NewUser) -> Vec<(&'static str, Value)> {
        vec![
            ("name", new.name.clone().into()),
            ("email", new.email.clone().into()),
            ("password_hash", new.password_hash.clone().into()),
            ("image_url", new.image_url.clone().into()),
        ]
    }

    fn patch_columns(patch: &UserPatch) -> Vec<(&'static str, Value)> {
        let mut columns = Vec::new();
        if let Some(name) = &patch.name {
            columns.push(("name", name.clone().into()));
        }
        if let Some(image_url) = &patch.image_url {
            columns.push(("image_url", image_url.clone().into()));
        }
        columns
    }

    fn build(id: Uuid, now: OffsetDateTime, new: NewUser) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: UserPatch, now: OffsetDateTime) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        self.updated_at = now;
    }

    fn column(&self, name: &str) -> Option<Value> {
        Some(match name {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "email" => self.email.clone().into(),
            "password_hash" => self.password_hash.clone().into(),
            "image_url" => self.image_url.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}
