// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surfaces: `/metrics` and the dynamic-config control API.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dix_core::SettingsHandle;
use dix_engine::Metrics;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Serve the Prometheus text endpoint.
pub fn spawn_metrics_server(metrics: Arc<Metrics>, port: u16) {
    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics);
    spawn_server("metrics", app, port);
}

/// Serve the dynamic-config API.
pub fn spawn_config_server(settings: SettingsHandle, port: u16) {
    let app = Router::new()
        .route("/config", get(get_config))
        .route("/config/update", post(update_config))
        .route("/config/reload", post(reload_config))
        .with_state(settings);
    spawn_server("config", app, port);
}

fn spawn_server(name: &'static str, app: Router, port: u16) {
    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!(server = name, %addr, error = %e, "failed to bind");
                return;
            }
        };
        info!(server = name, %addr, "listening");
        if let Err(e) = axum::serve(listener, app).await {
            error!(server = name, error = %e, "server stopped");
        }
    });
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.render()
}

async fn get_config(State(settings): State<SettingsHandle>) -> Json<dix_core::Settings> {
    Json(settings.get())
}

/// Merge a JSON body into the settings. The first invalid key rejects the
/// whole update; the previous snapshot stays active.
async fn update_config(
    State(settings): State<SettingsHandle>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<dix_core::Settings>, (StatusCode, String)> {
    let map = body
        .as_object()
        .ok_or((StatusCode::BAD_REQUEST, "expected a JSON object".to_string()))?;
    settings
        .update(map)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(settings.get()))
}

#[derive(Deserialize)]
struct ReloadQuery {
    path: PathBuf,
}

async fn reload_config(
    State(settings): State<SettingsHandle>,
    Query(query): Query<ReloadQuery>,
) -> Result<Json<dix_core::Settings>, (StatusCode, String)> {
    settings
        .reload_from_file(&query.path)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(settings.get()))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
