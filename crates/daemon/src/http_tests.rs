// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::Settings;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn metrics_endpoint_renders_text_format() {
    let metrics = Metrics::new("");
    metrics.set_gauge("service_health", &["polkadot-node", "relay", ""], 1.0);
    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics);
    let base = serve(app).await;

    let body = reqwest::get(format!("{base}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("# TYPE service_health gauge"));
    assert!(body.contains("service_health{service=\"polkadot-node\""));
}

#[tokio::test]
async fn config_get_update_reload_cycle() {
    let settings = SettingsHandle::new(Settings::default());
    let app = Router::new()
        .route("/config", get(get_config))
        .route("/config/update", post(update_config))
        .route("/config/reload", post(reload_config))
        .with_state(settings.clone());
    let base = serve(app).await;
    let client = reqwest::Client::new();

    // GET returns the current snapshot.
    let body: serde_json::Value = client
        .get(format!("{base}/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cpu_warning_percent"], 80.0);

    // Valid update applies.
    let response = client
        .post(format!("{base}/config/update"))
        .json(&serde_json::json!({ "cpu_warning_percent": 70.0 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(settings.get().cpu_warning_percent, 70.0);

    // Invalid key rejects the whole body without partial application.
    let response = client
        .post(format!("{base}/config/update"))
        .json(&serde_json::json!({ "cpu_warning_percent": 60.0, "bogus": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(settings.get().cpu_warning_percent, 70.0);

    // Reload delegates to the update path.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.json");
    std::fs::write(&path, r#"{"low_peer_threshold": 9}"#).unwrap();
    let response = client
        .post(format!("{base}/config/reload"))
        .query(&[("path", path.to_str().unwrap())])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(settings.get().low_peer_threshold, 9);
}
