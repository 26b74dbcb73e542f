//! Service-level errors and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Failure of an entity service operation, with the entity it concerns.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to create {entity}: {message}")]
    Validation { entity: &'static str, message: String },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to {action} {entity}: {source}")]
    Store {
        entity: &'static str,
        action: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation { entity, message: message.into() }
    }

    /// Adapter for `map_err` that tags a store failure with entity context.
    pub fn store(entity: &'static str, action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ServiceError::Store { entity, action, source }
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::Validation { .. }) => StatusCode::BAD_REQUEST,
            AppError::Service(ServiceError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Service(ServiceError::Store { source, .. }) => match source {
                StoreError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::Persistence { .. } | StoreError::MissingFilter { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            AppError::Service(ServiceError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
