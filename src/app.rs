use std::net::SocketAddr;
use std::path::Path;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::state::AppState;
use crate::{audit, auth, bookings, dashboard, payments, users};

/// Plain `{success, message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let mut app = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(bookings::router())
                .merge(users::router())
                .merge(audit::router())
                .merge(dashboard::router())
                .merge(payments::router())
                .route("/health", get(health)),
        )
        .merge(payments::pay_page_router())
        .with_state(state);

    if let Some(dir) = static_dir {
        let index = Path::new(&dir).join("index.html");
        app = app.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }

    app.layer(CorsLayer::permissive()).layer(
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
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    async fn send(req: Request<Body>) -> StatusCode {
        app().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_is_public() {
        let req = Request::get("/api/health").body(Body::empty()).unwrap();
        assert_eq!(send(req).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn gated_routes_need_a_bearer_token() {
        for (method, uri) in [
            (Method::GET, "/api/bookings"),
            (Method::POST, "/api/bookings"),
            (Method::GET, "/api/users"),
            (Method::GET, "/api/audit-logs/stats"),
            (Method::GET, "/api/dashboard/stats"),
            (Method::POST, "/api/auth/logout"),
            (Method::GET, "/api/auth/me"),
        ] {
            let req = Request::builder()
                .method(method.clone())
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            assert_eq!(send(req).await, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let req = Request::get("/api/users")
            .header(header::AUTHORIZATION, "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let keys = crate::auth::jwt::JwtKeys::from_config(&state.config.jwt);
        let refresh = keys
            .sign_refresh(uuid::Uuid::new_v4(), "staff@kina.example")
            .unwrap();
        let req = Request::get("/api/bookings")
            .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
            .body(Body::empty())
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let req = Request::post("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"ana@example.com","password":"short","first_name":"Ana","last_name":"Reyes"}"#,
            ))
            .unwrap();
        assert_eq!(send(req).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_bad_request() {
        let req = Request::post("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@example.com"}"#))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let ct = res.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(ct.starts_with("application/json"));

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn payment_confirm_requires_all_fields() {
        let req = Request::post("/api/payments/confirm")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("booking_id=&token=abc&method=gcash"))
            .unwrap();
        assert_eq!(send(req).await, StatusCode::BAD_REQUEST);

        let req = Request::post("/api/payments/confirm")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"token":"abc"}"#))
            .unwrap();
        assert_eq!(send(req).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pay_page_for_malformed_id_is_not_found() {
        let req = Request::get("/pay/not-a-uuid?t=abc").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let ct = res.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(ct.starts_with("text/html"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_without_static_dir() {
        let req = Request::get("/nope").body(Body::empty()).unwrap();
        assert_eq!(send(req).await, StatusCode::NOT_FOUND);
    }

    #[test]
    fn message_response_shape() {
        let v = serde_json::to_value(MessageResponse::new("Booking deleted successfully")).unwrap();
        assert_eq!(v, json!({ "success": true, "message": "Booking deleted successfully" }));
    }
}
