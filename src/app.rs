use std::net::SocketAddr;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, auth::gate::require_session, categories, products, state::AppState};

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(categories::router())
        .merge(products::router())
        .route_layer(from_fn_with_state(state.tokens.clone(), require_session));

    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(protected)
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `token=<value>` pair from the login response.
    fn session_pair(res: &Response) -> String {
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn login(app: &Router) -> String {
        let res = send(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "alice", "email": "a@b.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let res = send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "a@b.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        session_pair(&res)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_hides_password_and_rejects_duplicates() {
        let app = build_app(AppState::fake());
        let payload = json!({ "username": "alice", "email": "a@b.com", "password": "secret123" });

        let res = send(&app, Method::POST, "/api/v1/auth/register", None, Some(payload.clone())).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json_body(res).await;
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["username"], "alice");
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());

        let res = send(&app, Method::POST, "/api/v1/auth/register", None, Some(payload)).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(res).await["error"], "Email already registered");
    }

    #[tokio::test]
    async fn register_validation_is_bad_request() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "alice", "email": "a@b.com", "password": "short" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_sets_locked_down_cookie() {
        let app = build_app(AppState::fake());
        send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "alice", "email": "a@b.com", "password": "secret123" })),
        )
        .await;
        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "a@b.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains("Max-Age=86400"));
        let body = json_body(res).await;
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["email"], "a@b.com");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = build_app(AppState::fake());
        login(&app).await;
        let res = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "a@b.com", "password": "wrong-pass" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let app = build_app(AppState::fake());
        let res = send(&app, Method::POST, "/api/v1/auth/logout", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert_eq!(json_body(res).await["message"], "Logout successful");
    }

    #[tokio::test]
    async fn protected_routes_require_session() {
        let app = build_app(AppState::fake());
        for uri in ["/api/v1/category", "/api/v1/product", "/api/v1/auth/me"] {
            let res = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn create_with_garbage_cookie_is_rejected() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            Method::POST,
            "/api/v1/category",
            Some("token=not.a.jwt"),
            Some(json!({ "name": "Tools", "colorHex": "#fff" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(res).await;
        assert_eq!(body["code"], "INVALID_TOKEN");
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn huge_page_number_is_an_empty_page() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        let res = send(
            &app,
            Method::GET,
            "/api/v1/category?page=9223372036854775807&limit=10",
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert!(body["data"].as_array().unwrap().is_empty());
        assert_eq!(body["pagination"]["totalItems"], 0);
        assert_eq!(body["pagination"]["hasNext"], false);
    }

    #[tokio::test]
    async fn me_returns_current_user() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        let res = send(&app, Method::GET, "/api/v1/auth/me", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["email"], "a@b.com");
    }

    #[tokio::test]
    async fn category_lifecycle() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        let me = json_body(send(&app, Method::GET, "/api/v1/auth/me", Some(&cookie), None).await).await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/category",
            Some(&cookie),
            Some(json!({ "name": "Tools", "colorHex": "#fff" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = json_body(res).await;
        assert_eq!(created["userId"], me["id"]);
        let id = created["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            Method::PUT,
            &format!("/api/v1/category/{id}"),
            Some(&cookie),
            Some(json!({ "name": "Hand tools" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["colorHex"], "#fff");

        let res = send(&app, Method::DELETE, &format!("/api/v1/category/{id}"), Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["message"], "Category deleted successfully");

        let res = send(&app, Method::GET, &format!("/api/v1/category/{id}"), Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_category_fields_is_bad_request() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        let res = send(
            &app,
            Method::POST,
            "/api/v1/category",
            Some(&cookie),
            Some(json!({ "name": "Tools" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn product_price_is_exact() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        let category = json_body(
            send(
                &app,
                Method::POST,
                "/api/v1/category",
                Some(&cookie),
                Some(json!({ "name": "Tools", "colorHex": "#fff" })),
            )
            .await,
        )
        .await;

        let res = send(
            &app,
            Method::POST,
            "/api/v1/product",
            Some(&cookie),
            Some(json!({ "name": "Hammer", "price": "19.99", "categoryId": category["id"] })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let product = json_body(res).await;
        assert_eq!(product["price"], "19.99");

        let res = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/product/{}", product["id"].as_str().unwrap()),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(json_body(res).await["message"], "Product deleted successfully");
    }

    #[tokio::test]
    async fn listing_paginates() {
        let app = build_app(AppState::fake());
        let cookie = login(&app).await;
        for i in 0..12 {
            let res = send(
                &app,
                Method::POST,
                "/api/v1/category",
                Some(&cookie),
                Some(json!({ "name": format!("c{i}"), "colorHex": "#fff" })),
            )
            .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = send(&app, Method::GET, "/api/v1/category?page=2&limit=5", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
        assert_eq!(body["pagination"]["totalItems"], 12);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["hasNext"], true);
        assert_eq!(body["pagination"]["hasPrev"], true);

        let res = send(&app, Method::GET, "/api/v1/category?name=c3", Some(&cookie), None).await;
        let body = json_body(res).await;
        assert_eq!(body["pagination"]["totalItems"], 1);
        assert_eq!(body["data"][0]["name"], "c3");
    }
}
