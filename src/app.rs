use std::net::SocketAddr;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;

use crate::{admin, auth, cors, error::ApiError, products, response::Envelope, state::AppState};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(admin::router())
        .route("/health", get(health))
        .route("/test", get(test_probe));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors::origin_gate,
        ))
        .layer(cors::cors_layer(&state.config.cors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
        .with_state(state)
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5001".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct HealthPayload {
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct TestPayload {
    pub features: Features,
}

#[derive(Debug, Serialize)]
pub struct Features {
    pub server: &'static str,
    pub database: &'static str,
    pub api: &'static str,
}

async fn health(
    State(state): State<AppState>,
) -> Result<Json<Envelope<HealthPayload>>, ApiError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ApiError::internal("Server error", e))?;
    Ok(Json(Envelope::with_message(
        "Server is healthy",
        HealthPayload {
            timestamp,
            environment: state.config.environment.clone(),
        },
    )))
}

async fn test_probe() -> Json<Envelope<TestPayload>> {
    Json(Envelope::with_message(
        "All systems operational",
        TestPayload {
            features: Features {
                server: "running",
                database: "connected",
                api: "responsive",
            },
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_app() -> String {
        let app = build_app(AppState::fake());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn health_probe_reports_envelope() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/health", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Server is healthy");
        assert_eq!(body["environment"], "test");
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_probe_reports_features() {
        let base = spawn_app().await;
        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("{}/api/test", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["features"]["server"], "running");
    }

    #[tokio::test]
    async fn full_app_rejects_unlisted_origin() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/health", base))
            .header("Origin", "https://evil.example")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn protected_route_requires_bearer_token() {
        let base = spawn_app().await;
        let response = reqwest::Client::new()
            .get(format!("{}/api/auth/me", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing Authorization header");
    }
}
