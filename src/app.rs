use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::{auth, config::AppConfig, state::AppState, todos, users};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.session.secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            state.config.session.ttl_hours,
        )));

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(todos::router())
        .route("/health", get(health))
        .with_state(state)
        .layer(sessions)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
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

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

/// Credentialed CORS for the configured frontend, permissive otherwise.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origin) = config.frontend_url.as_deref() else {
        return CorsLayer::permissive();
    };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            tracing::warn!(error = %e, origin, "invalid FRONTEND_URL; using permissive CORS");
            CorsLayer::permissive()
        }
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down gracefully");
}
