use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::CategoryInput,
    repo_types::{Category, CategoryPatch},
    services::CategoryService,
};
use crate::{
    auth::token::AuthUser,
    error::AppError,
    pagination::ListQuery,
    state::AppState,
    store::Paginated,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/category", get(list_categories).post(create_category))
        .route(
            "/category/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[instrument(skip(svc, user, body))]
pub async fn create_category(
    State(svc): State<CategoryService>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = svc.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(svc))]
pub async fn list_categories(
    State(svc): State<CategoryService>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Paginated<Category>>, AppError> {
    Ok(Json(svc.list(q.into()).await?))
}

#[instrument(skip(svc))]
pub async fn get_category(
    State(svc): State<CategoryService>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(svc.get_by_id(id).await?))
}

#[instrument(skip(svc, body))]
pub async fn update_category(
    State(svc): State<CategoryService>,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryPatch>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(svc.update(id, body).await?))
}

#[instrument(skip(svc))]
pub async fn delete_category(
    State(svc): State<CategoryService>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    svc.delete(id).await?;
    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
