//! Client and dashboard behavior against a backend with scripted replies.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use perfwatch::app::Screen;
use perfwatch::{App, ClientError, HttpBackend, MetricPoint, MetricsFetcher, MetricsSnapshot, ScorePoint};

/// Replies in order; the last one repeats.
#[derive(Debug)]
struct Script(Mutex<VecDeque<(u16, String)>>);

impl Script {
    fn next(&self) -> (u16, String) {
        let mut replies = self.0.lock();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }
}

async fn start_stub(replies: Vec<(u16, String)>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let script = Arc::new(Script(Mutex::new(replies.into())));

    let handle = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let script = script.clone();
            tokio::spawn(async move {
                let service = service_fn(move |_req: Request<Incoming>| {
                    let (status, body) = script.next();
                    async move {
                        let mut response = Response::new(Full::new(Bytes::from(body)));
                        *response.status_mut() = StatusCode::from_u16(status).unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });
    (url, handle)
}

fn valid_snapshot() -> MetricsSnapshot {
    let point = |value: f64| MetricPoint {
        timestamp: "10:00:00".to_string(),
        value,
    };
    MetricsSnapshot {
        performance: vec![ScorePoint {
            date: "2024-02-14 10:00:00".to_string(),
            score: 88.0,
        }],
        lcp: vec![point(2.4)],
        tbt: vec![point(280.0)],
        inp: vec![point(150.0)],
    }
}

fn replies() -> Vec<(u16, String)> {
    vec![
        (200, serde_json::to_string(&valid_snapshot()).unwrap()),
        (200, r#"{"lcp":[]}"#.to_string()),
        (200, "<html>gateway</html>".to_string()),
        (500, "internal error".to_string()),
    ]
}

fn performance(app: &App) -> (Option<MetricsSnapshot>, Option<String>) {
    match &app.screen {
        Screen::Performance(screen) => (screen.snapshot.clone(), screen.last_error.clone()),
        _ => panic!("performance view not mounted"),
    }
}

/// Drain app events until `done` holds or the wait runs out.
async fn wait_for(app: &mut App, done: impl Fn(&App) -> bool) {
    for _ in 0..250 {
        app.process_events();
        if done(app) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("dashboard did not reach the expected state");
}

#[tokio::test]
async fn test_fetch_classifies_bad_replies() {
    let (url, handle) = start_stub(replies()).await;
    let backend = HttpBackend::new(&url).unwrap();

    assert_eq!(backend.fetch_metrics().await.unwrap(), valid_snapshot());

    let partial = backend.fetch_metrics().await.unwrap_err();
    assert!(matches!(partial, ClientError::Snapshot(_)), "{:?}", partial);

    let not_json = backend.fetch_metrics().await.unwrap_err();
    assert!(matches!(not_json, ClientError::Snapshot(_)), "{:?}", not_json);

    let server_error = backend.fetch_metrics().await.unwrap_err();
    assert!(
        matches!(server_error, ClientError::Status { status: 500 }),
        "{:?}",
        server_error
    );
    handle.abort();
}

#[tokio::test]
async fn test_dashboard_keeps_snapshot_through_bad_replies() {
    let (url, handle) = start_stub(replies()).await;
    let backend = Arc::new(HttpBackend::new(&url).unwrap());
    // Long interval: every poll after the first is triggered explicitly.
    let mut app = App::new(backend, Duration::from_secs(3600));

    wait_for(&mut app, |app| performance(app).0.is_some()).await;
    let (snapshot, error) = performance(&app);
    assert_eq!(snapshot, Some(valid_snapshot()));
    assert_eq!(error, None);

    app.poll_now();
    wait_for(&mut app, |app| performance(app).1.is_some()).await;
    let (snapshot, error) = performance(&app);
    assert_eq!(snapshot, Some(valid_snapshot()));
    assert!(error.unwrap().contains("Invalid metrics payload"));

    // Requests coalesce while one is in flight, so keep asking until the 500 lands.
    let mut reached = false;
    for _ in 0..250 {
        app.process_events();
        if performance(&app).1.is_some_and(|e| e.contains("500")) {
            reached = true;
            break;
        }
        app.poll_now();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reached, "server error never reported");
    let (snapshot, _) = performance(&app);
    assert_eq!(snapshot, Some(valid_snapshot()));
    handle.abort();
}
