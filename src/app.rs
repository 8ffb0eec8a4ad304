use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, recipes, state::AppState};

#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub port: u16,
    pub profile: String,
}

async fn info(State(state): State<AppState>) -> Json<AppInfo> {
    let config = &state.config;
    Json(AppInfo {
        name: config.app_name.clone(),
        version: config.app_version.clone(),
        port: config.port,
        profile: config.profile.clone(),
    })
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(recipes::router())
        .route("/health", get(|| async { "ok" }))
        .route("/info", get(info))
        .with_state(state)
        .layer(CorsLayer::permissive())
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
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn info_reports_config() {
        let state = AppState::in_memory(AppConfig::local("dev-secret"));
        let Json(body) = info(State(state)).await;
        assert_eq!(body.name, "recipe-catalog");
        assert_eq!(body.port, 8080);
        assert_eq!(body.profile, "test");
    }

    #[test]
    fn router_builds_without_route_conflicts() {
        let _ = build_app(AppState::in_memory(AppConfig::local("dev-secret")));
    }
}
