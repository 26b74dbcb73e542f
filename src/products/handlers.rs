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
    dto::ProductInput,
    repo_types::{Product, ProductPatch},
    services::ProductService,
};
use crate::{
    auth::token::AuthUser,
    error::AppError,
    pagination::ListQuery,
    state::AppState,
    store::Paginated,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/product", get(list_products).post(create_product))
        .route(
            "/product/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(svc, user, body))]
pub async fn create_product(
    State(svc): State<ProductService>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = svc.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(svc))]
pub async fn list_products(
    State(svc): State<ProductService>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Paginated<Product>>, AppError> {
    Ok(Json(svc.list(q.into()).await?))
}

#[instrument(skip(svc))]
pub async fn get_product(
    State(svc): State<ProductService>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(svc.get_by_id(id).await?))
}

#[instrument(skip(svc, body))]
pub async fn update_product(
    State(svc): State<ProductService>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductPatch>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(svc.update(id, body).await?))
}

#[instrument(skip(svc))]
pub async fn delete_product(
    State(svc): State<ProductService>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    svc.delete(id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
