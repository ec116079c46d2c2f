//! HTTP reporting surface.
//!
//! The engine's external collaborator: three plain-text endpoints
//! mirroring the virtual files classic kernel profilers expose under
//! procfs.
//!
//! - `GET /top_list` — the ranked report table
//! - `GET /reset_result` — triggers the swap-protocol reset
//! - `GET`/`PUT /monitor_pid` — the uninterpreted integer cell

use crate::core::{Config, Result};
use crate::engine::MonitorEngine;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Report server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: IpAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".parse().expect("valid default IP address"),
        }
    }
}

impl ApiConfig {
    /// Extract the report server settings from the full configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.http_port,
            bind_address: config.server.bind_address,
        }
    }
}

/// Report server state.
#[derive(Clone)]
struct ApiState {
    engine: Arc<MonitorEngine>,
}

/// Build the report router for the given engine.
pub fn router(engine: Arc<MonitorEngine>) -> Router {
    Router::new()
        .route("/top_list", get(top_list_handler))
        .route("/reset_result", get(reset_handler))
        .route("/monitor_pid", get(show_monitor_pid).put(store_monitor_pid))
        .with_state(ApiState { engine })
}

/// Start the report server and serve until the task is dropped.
pub async fn start_server(engine: Arc<MonitorEngine>, config: ApiConfig) -> Result<()> {
    let app = router(engine);

    let addr = format!("{}:{}", config.bind_address, config.port);
    tracing::info!("Starting report server on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /top_list - ranked monitor point table.
async fn top_list_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.top_list() {
        Ok(table) => (StatusCode::OK, table),
        Err(err) => {
            tracing::error!(%err, "failed to render top list");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Fail to allocate result memory\n"),
            )
        },
    }
}

/// GET /reset_result - reset all counters via the swap protocol.
async fn reset_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match state.engine.reset() {
        Ok(()) => (
            StatusCode::OK,
            String::from("Reset the stats of monitor stats\n"),
        ),
        Err(err) => {
            tracing::error!(%err, "reset failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Fail to allocate monitor\n"),
            )
        },
    }
}

/// GET /monitor_pid - show the stored pid.
async fn show_monitor_pid(State(state): State<ApiState>) -> String {
    format!("{}\n", state.engine.monitor_pid())
}

/// PUT /monitor_pid - store a new pid value.
async fn store_monitor_pid(State(state): State<ApiState>, body: String) -> impl IntoResponse {
    match body.trim().parse::<u64>() {
        Ok(pid) => {
            state.engine.set_monitor_pid(pid);
            (StatusCode::OK, format!("{}\n", pid))
        },
        Err(_) => (
            StatusCode::BAD_REQUEST,
            String::from("monitor_pid expects an unsigned integer\n"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryConfig;
    use axum::body::to_bytes;

    fn state() -> ApiState {
        let engine = MonitorEngine::new(&RegistryConfig {
            max_points: 16,
            buckets: 8,
            workers: 2,
            monitor_pid: 0,
        })
        .expect("engine");
        ApiState {
            engine: Arc::new(engine),
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn top_list_renders_placeholder_without_points() {
        let state = state();
        let response = top_list_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "No monitor point\n");
    }

    #[tokio::test]
    async fn top_list_renders_registered_points() {
        let state = state();
        let handle = state.engine.add_point("api_point").expect("add");
        state.engine.start(&handle);
        state.engine.end(&handle);

        let response = top_list_handler(State(state)).await.into_response();
        let body = body_text(response).await;
        assert!(body.starts_with("monitor"));
        assert!(body.contains("api_point"));
    }

    #[tokio::test]
    async fn reset_reports_confirmation_line() {
        let state = state();
        state.engine.add_point("to_reset").expect("add");

        let response = reset_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Reset the stats of monitor stats\n");
        assert_eq!(state.engine.live_points(), 1);
    }

    #[tokio::test]
    async fn monitor_pid_round_trips_over_http() {
        let state = state();

        let response = store_monitor_pid(State(state.clone()), "1234".to_string())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let shown = show_monitor_pid(State(state)).await;
        assert_eq!(shown, "1234\n");
    }

    #[tokio::test]
    async fn monitor_pid_rejects_garbage() {
        let state = state();
        let response = store_monitor_pid(State(state), "not-a-pid".to_string())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
