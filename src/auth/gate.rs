//! Session gate for protected routes.
//!
//! Reads the `token` cookie, verifies it and stores the caller's [`AuthUser`]
//! in the request extensions before handing over to the next handler.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use tracing::{error, warn};

use super::{
    session::SESSION_COOKIE,
    token::{TokenError, TokenService},
};

/// Why the gate refused a request.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    Expired,
    Invalid,
    Failed,
}

impl AuthRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::Failed => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthRejection::MissingToken => None,
            AuthRejection::Expired => Some("TOKEN_EXPIRED"),
            AuthRejection::Invalid => Some("INVALID_TOKEN"),
            AuthRejection::Failed => Some("AUTH_FAILED"),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "Access denied. No token provided.",
            AuthRejection::Expired => "Token expired",
            AuthRejection::Invalid => "Invalid token",
            AuthRejection::Failed => "Authentication failed",
        }
    }
}

impl From<TokenError> for AuthRejection {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthRejection::Expired,
            TokenError::Invalid(_) => AuthRejection::Invalid,
            TokenError::Failed(_) | TokenError::Signing(_) => AuthRejection::Failed,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = match self.code() {
            Some(code) => json!({ "error": self.message(), "code": code }),
            None => json!({ "error": self.message() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Middleware: `Unauthenticated -> Authenticated` or reject.
pub async fn require_session(
    State(tokens): State<TokenService>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) else {
        warn!(uri = %req.uri(), "no session cookie");
        return Err(AuthRejection::MissingToken);
    };

    let claims = tokens.verify(cookie.value()).map_err(|e| {
        match &e {
            TokenError::Failed(_) | TokenError::Signing(_) => {
                error!(error = %e, "session verification failed")
            }
            _ => warn!(error = %e, "session token rejected"),
        }
        AuthRejection::from(e)
    })?;

    req.extensions_mut().insert(claims.identity());
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::header,
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use time::{Duration as TimeDuration, OffsetDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{auth::token::AuthUser, config::JwtConfig};

    fn tokens() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "gate-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 60,
        })
    }

    fn app(tokens: TokenService) -> Router {
        Router::new()
            .route(
                "/private",
                get(|Extension(user): Extension<AuthUser>| async move { user.email }),
            )
            .route_layer(from_fn_with_state(tokens.clone(), require_session))
            .with_state(tokens)
    }

    async fn call(tokens: TokenService, cookie: Option<String>) -> (StatusCode, serde_json::Value, String) {
        let mut req = Request::builder().uri("/private");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let res = app(tokens).oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        (status, json, text)
    }

    #[tokio::test]
    async fn missing_cookie_is_denied() {
        let (status, body, _) = call(tokens(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied. No token provided.");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn empty_cookie_is_denied() {
        let (status, body, _) = call(tokens(), Some("token=".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied. No token provided.");
    }

    #[tokio::test]
    async fn expired_token_reports_code() {
        let tokens = tokens();
        let user = AuthUser { id: Uuid::new_v4(), email: "a@b.com".into() };
        let token = tokens
            .issue_at(&user, OffsetDateTime::now_utc() - TimeDuration::hours(2))
            .unwrap();
        let (status, body, _) = call(tokens, Some(format!("token={token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn garbage_token_reports_invalid() {
        let (status, body, _) = call(tokens(), Some("token=abc.def.ghi".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_identity() {
        let tokens = tokens();
        let user = AuthUser { id: Uuid::new_v4(), email: "a@b.com".into() };
        let token = tokens.issue(&user).unwrap();
        let (status, _, text) = call(tokens, Some(format!("other=1; token={token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "a@b.com");
    }

    #[test]
    fn verification_failures_are_server_errors() {
        let rejection = AuthRejection::from(TokenError::Failed("key".into()));
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rejection.code(), Some("AUTH_FAILED"));
        assert_eq!(rejection.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
