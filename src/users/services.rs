use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::{
    auth::password::{hash_password, verify_password},
    error::ServiceError,
    state::AppState,
    store::{Filter, Record, RecordStore},
    validation::{is_valid_email, required_text},
};

const ENTITY: &str = User::KIND;
const MIN_PASSWORD_LEN: usize = 8;

/// Registration input after JSON decoding.
#[derive(Debug, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore<User>>,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore<User>>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: Registration) -> Result<User, ServiceError> {
        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            warn!("invalid email");
            return Err(ServiceError::validation(ENTITY, "Invalid email"));
        }
        let Some(name) = required_text(input.name) else {
            return Err(ServiceError::validation(ENTITY, "Please fill in all required fields."));
        };
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(ServiceError::validation(ENTITY, "Password too short"));
        }

        let taken = self
            .store
            .find_one(&Filter::new().eq("email", email.clone()))
            .await
            .map_err(ServiceError::store(ENTITY, "create"))?;
        if taken.is_some() {
            warn!("email already registered");
            return Err(ServiceError::Conflict("Email already registered".into()));
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let user = self
            .store
            .create(NewUser { name, email, password_hash, image_url: input.image_url })
            .await
            .map_err(ServiceError::store(ENTITY, "create"))?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// `None` for an unknown email and for a wrong password alike.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, ServiceError> {
        let email = normalize_email(email);
        let Some(user) = self
            .store
            .find_one(&Filter::new().eq("email", email))
            .await
            .map_err(ServiceError::store(ENTITY, "load"))?
        else {
            warn!("login unknown email");
            return Ok(None);
        };

        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .map_err(|e| {
                error!(error = %e, user_id = %user.id, "verify_password failed");
                ServiceError::Internal(e.to_string())
            })?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(ServiceError::store(ENTITY, "load"))?
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })
    }
}
