use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::auth::token::TokenService;
use crate::categories::repo_types::Category;
use crate::config::{AppConfig, DbConfig, StoreBackend};
use crate::products::repo_types::Product;
use crate::store::{MemoryRecordStore, PgRecordStore, RecordStore};
use crate::users::repo_types::User;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub users: Arc<dyn RecordStore<User>>,
    pub categories: Arc<dyn RecordStore<Category>>,
    pub products: Arc<dyn RecordStore<Product>>,
    /// Present only for the PostgreSQL backend.
    pub db: Option<PgPool>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let statement_timeout = format!("{}ms", cfg.statement_timeout().as_millis());
    let options = cfg
        .url
        .parse::<PgConnectOptions>()
        .context("parse DATABASE_URL")?
        .options([("statement_timeout", statement_timeout)]);
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout())
        .connect_with(options)
        .await
        .context("connect to database")
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        match config.backend {
            StoreBackend::Postgres => {
                let db = connect(&config.db).await?;
                Ok(Self::postgres(config, db))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn postgres(config: AppConfig, db: PgPool) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt),
            config: Arc::new(config),
            users: Arc::new(PgRecordStore::<User>::new(db.clone())),
            categories: Arc::new(PgRecordStore::<Category>::new(db.clone())),
            products: Arc::new(PgRecordStore::<Product>::new(db.clone())),
            db: Some(db),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt),
            config: Arc::new(config),
            users: Arc::new(MemoryRecordStore::<User>::new()),
            categories: Arc::new(MemoryRecordStore::<Category>::new()),
            products: Arc::new(MemoryRecordStore::<Product>::new()),
            db: None,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(AppConfig::for_tests())
    }
}
