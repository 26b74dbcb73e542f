use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod gate;
pub mod handlers;
pub mod password;
pub mod session;
pub mod token;

/// Register, login and logout. No session required.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes that sit behind the session gate.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
