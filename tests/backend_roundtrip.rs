//! Drives the HTTP client against the development backend.

use std::sync::Arc;
use std::time::Duration;

use perfwatch::server::Server;
use perfwatch::{App, Backend, ClientError, HttpBackend, MetricsFetcher, OptimizationKind, Settings};

async fn start(grafana_origin: &str) -> (String, tokio::task::JoinHandle<()>) {
    let server = Server::bind("127.0.0.1:0", grafana_origin).await.unwrap();
    let url = format!("http://{}", server.local_addr().unwrap());
    (url, server.spawn())
}

#[tokio::test]
async fn test_metrics_and_optimization() {
    let (url, handle) = start("http://127.0.0.1:9").await;
    let backend = HttpBackend::new(&url).unwrap();

    let snapshot = backend.fetch_metrics().await.unwrap();
    assert_eq!(snapshot.performance.len(), 1);
    assert_eq!(snapshot.latest_lcp(), Some(2.2));
    assert_eq!(snapshot.latest_score(), Some(92.0));

    let response = backend.optimize(OptimizationKind::Images).await.unwrap();
    assert_eq!(response.status, "success");
    let metrics = response.new_metrics.unwrap();
    assert_eq!(metrics.score, 94.0);
    assert_eq!(metrics.lcp, 2.0);

    let snapshot = backend.fetch_metrics().await.unwrap();
    assert_eq!(snapshot.lcp.len(), 2);
    assert_eq!(snapshot.latest_lcp(), Some(2.0));
    handle.abort();
}

#[tokio::test]
async fn test_settings_save_and_rejection() {
    let (url, handle) = start("http://127.0.0.1:9").await;
    let backend = HttpBackend::new(&url).unwrap();

    backend.save_settings(&Settings::default()).await.unwrap();

    let mut invalid = Settings::default();
    invalid.thresholds.lcp = -1.0;
    let err = backend.save_settings(&invalid).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 422, .. }));
    handle.abort();
}

#[tokio::test]
async fn test_optimize_without_type_is_bad_request() {
    let (url, handle) = start("http://127.0.0.1:9").await;
    let response = reqwest::Client::new()
        .post(format!("{}/optimize", url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    handle.abort();
}

#[tokio::test]
async fn test_grafana_proxy() {
    // A second backend stands in for Grafana.
    let (upstream, upstream_handle) = start("http://127.0.0.1:9").await;
    let (url, handle) = start(&upstream).await;

    let response = reqwest::get(format!("{}/grafana/health", url)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    let response = reqwest::get(format!("{}/grafana/performance?orgId=1", url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let summary: serde_json::Value = response.json().await.unwrap();
    assert_eq!(summary["score"], 92.0);

    upstream_handle.abort();
    handle.abort();
}

#[tokio::test]
async fn test_unreachable_connection_error() {
    let backend = HttpBackend::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = backend.fetch_metrics().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Connection(_) | ClientError::Http(_) | ClientError::Timeout
    ));
}

#[tokio::test]
async fn test_dashboard_receives_first_snapshot() {
    let (url, handle) = start("http://127.0.0.1:9").await;
    let backend = Arc::new(HttpBackend::new(&url).unwrap());
    let mut app = App::new(backend, Duration::from_secs(60));

    let mut received = false;
    for _ in 0..100 {
        app.process_events();
        if app.source_description().contains(&url) && latest_score(&app) == Some(92.0) {
            received = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(received, "no snapshot delivered to the dashboard");
    handle.abort();
}

fn latest_score(app: &App) -> Option<f64> {
    match &app.screen {
        perfwatch::app::Screen::Performance(screen) => {
            screen.snapshot.as_ref().and_then(|s| s.latest_score())
        }
        _ => None,
    }
}
