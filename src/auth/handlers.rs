use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        session::{cleared_session_cookie, session_cookie},
        token::AuthUser,
    },
    error::{AppError, ServiceError},
    state::AppState,
    users::services::UserService,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(users, payload))]
pub async fn register(
    State(users): State<UserService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = users.register(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { message: "User registered successfully", user: user.into() }),
    ))
}

#[instrument(skip(state, users, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    State(users): State<UserService>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let Some(user) = users.authenticate(&payload.email, &payload.password).await? else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    let identity = AuthUser { id: user.id, email: user.email.clone() };
    let token = state
        .tokens
        .issue(&identity)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    let max_age = time::Duration::seconds(state.tokens.ttl().as_secs() as i64);
    let jar = jar.add(session_cookie(token, state.config.secure_cookies, max_age));

    info!(user_id = %user.id, "user logged in");
    Ok((jar, Json(AuthResponse { message: "Login successful", user: user.into() })))
}

/// Clears the cookie unconditionally; the token itself stays valid until expiry.
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(cleared_session_cookie(state.config.secure_cookies));
    (jar, Json(json!({ "message": "Logout successful" })))
}

#[instrument(skip(users, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(users): State<UserService>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PublicUser>, AppError> {
    match users.get_by_id(user.id).await {
        Ok(found) => Ok(Json(found.into())),
        Err(ServiceError::NotFound { .. }) => {
            warn!("session refers to a deleted user");
            Err(AppError::Unauthorized("User not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}
