//! HTTP routes for the auth service.

use crate::handlers::auth_handler::{self, AppState};
use crate::handlers::{health_handler, jwks_handler};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use crate::observability::metrics::init_metrics_recorder;

/// Build the application routes.
///
/// Every auth endpoint answers with and without its trailing slash.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_routes = Router::new()
        .route(
            "/register/student/",
            post(auth_handler::handle_register_student),
        )
        .route(
            "/register/student",
            post(auth_handler::handle_register_student),
        )
        .route(
            "/register/teacher/",
            post(auth_handler::handle_register_teacher),
        )
        .route(
            "/register/teacher",
            post(auth_handler::handle_register_teacher),
        )
        .route("/login/student/", post(auth_handler::handle_login_student))
        .route("/login/student", post(auth_handler::handle_login_student))
        .route("/login/teacher/", post(auth_handler::handle_login_teacher))
        .route("/login/teacher", post(auth_handler::handle_login_teacher))
        .route("/token/refresh/", post(auth_handler::handle_token_refresh))
        .route("/token/refresh", post(auth_handler::handle_token_refresh))
        // JWKS (RFC 8414 well-known path)
        .route("/.well-known/jwks.json", get(jwks_handler::handle_get_jwks))
        .with_state(state);

    let operational_routes = Router::new()
        .route("/health", get(health_handler::health_check))
        .route("/metrics", get(health_handler::metrics_handler))
        .with_state(metrics_handle);

    auth_routes
        .merge(operational_routes)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Config, MIN_BCRYPT_COST};
    use crate::crypto;
    use crate::db;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use common::secret::SecretBox;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            bind_address: "127.0.0.1:0".to_string(),
            signing_key: SecretBox::new(Box::new(crypto::generate_signing_key().unwrap())),
            bcrypt_cost: MIN_BCRYPT_COST,
            access_token_lifetime_seconds: 1800,
            refresh_token_lifetime_seconds: 432_000,
            jwt_clock_skew_seconds: 300,
            teacher_email_domain: "physics.cu.ac.bd".to_string(),
        };
        let pool = db::connect(&config.database_url, 1).await.unwrap();
        let state = Arc::new(AppState::new(pool, config).unwrap());
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_jwks_is_cacheable() {
        let app = app().await;
        let response = app
            .oneshot(
                Request::get("/.well-known/jwks.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "max-age=3600"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let jwks: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(jwks["keys"][0]["kty"], "OKP");
        assert_eq!(jwks["keys"][0]["alg"], "EdDSA");
    }

    #[tokio::test]
    async fn test_register_and_login_with_and_without_trailing_slash() {
        let app = app().await;
        let student = json!({
            "full_name": "A",
            "varsity_id": "12345678",
            "email": "a@x.com",
            "password": "p1"
        });

        let (status, body) = send(&app, Method::POST, "/register/student/", Some(student)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["varsity_id"], "12345678");
        assert_eq!(body["full_name"], "A");
        assert!(body["id"].is_string());
        assert!(body.get("password").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/login/student",
            Some(json!({"varsity_id": "12345678", "password": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access"].is_string());
        assert!(body["refresh"].is_string());
    }

    #[tokio::test]
    async fn test_login_failure_shape() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/login/teacher/",
            Some(json!({"email": "nobody@physics.cu.ac.bd", "password": "x"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"detail": "Invalid email or password"}));
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_token() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/token/refresh/",
            Some(json!({"refresh": "not.a.token"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})
        );
    }

    #[tokio::test]
    async fn test_teacher_registration_validation_shape() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/register/teacher/",
            Some(json!({"full_name": "T", "email": "t@gmail.com", "password": "p"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"email": ["Email must end with @physics.cu.ac.bd"]})
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app().await;
        let (status, _) = send(&app, Method::GET, "/admin/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
