//! Development backend.
//!
//! Serves the endpoints the dashboard consumes from in-memory state so the
//! whole system runs locally:
//!
//! | Route                  | Behavior                                        |
//! |------------------------|-------------------------------------------------|
//! | `GET /metrics`         | recorded samples as a `MetricsSnapshot`         |
//! | `GET /performance`     | current `{score, lcp, tbt, inp}`                |
//! | `POST /update-metrics` | partial update of the current values            |
//! | `POST /optimize`       | simulated optimization, `{type}` required       |
//! | `GET/PUT /settings`    | settings document, validated on write           |
//! | `GET /health`          | liveness                                        |
//! | `GET /prometheus`      | request counters, latency and score gauges      |
//! | `/grafana/*`           | forwarded to the configured Grafana origin      |
//!
//! Request bodies over [`MAX_BODY_BYTES`] are refused with `413`.
//!
//! ```rust,no_run
//! use perfwatch::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind("127.0.0.1:8000", "http://grafana:3000").await?;
//!     server.run().await
//! }
//! ```

mod exposition;
mod proxy;
mod state;

pub use exposition::RequestMetrics;
pub use proxy::GrafanaProxy;
pub use state::{BackendState, MetricsUpdate, UpdateError, INITIAL_SUMMARY};

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::data::OptimizationKind;
use crate::settings::Settings;

/// Largest request body accepted, proxied bodies included.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body of `POST /optimize` as received; `type` may be missing.
#[derive(Debug, Deserialize)]
struct OptimizeBody {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Shared by every connection.
#[derive(Debug)]
struct Shared {
    state: Arc<BackendState>,
    proxy: GrafanaProxy,
    requests: RequestMetrics,
}

/// A bound, not yet running, development backend.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    /// Bind `listen_addr`. Port 0 picks a free port.
    pub async fn bind(listen_addr: &str, grafana_origin: &str) -> Result<Self> {
        let addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", listen_addr))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        let proxy = GrafanaProxy::new(grafana_origin).context("failed to build proxy client")?;

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                state: Arc::new(BackendState::default()),
                proxy,
                requests: RequestMetrics::new(),
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the state the server serves.
    pub fn state(&self) -> Arc<BackendState> {
        self.shared.state.clone()
    }

    /// Accept connections until the task is cancelled.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, grafana = self.shared.proxy.origin(), "development backend listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let shared = self.shared.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let shared = shared.clone();
                    async move { Ok::<_, Infallible>(handle_request(req, &shared).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = %e, "connection closed with error");
                }
            });
        }
    }

    /// Run in a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(error = %e, "development backend stopped");
            }
        })
    }
}

async fn handle_request(req: Request<Incoming>, shared: &Shared) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = if is_proxied(&path) {
        shared.proxy.forward(req).await
    } else {
        route(req, method.clone(), &path, shared).await
    };

    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    shared
        .requests
        .observe(method.as_str(), endpoint_label(&path), started.elapsed());
    debug!(%method, %path, status = response.status().as_u16(), "request handled");
    response
}

fn is_proxied(path: &str) -> bool {
    path == proxy::PREFIX || path.starts_with("/grafana/")
}

/// Label for request metrics; unknown paths share one label.
fn endpoint_label(path: &str) -> &str {
    match path {
        "/" | "/health" | "/healthz" | "/metrics" | "/performance" | "/prometheus"
        | "/update-metrics" | "/optimize" | "/settings" => path,
        _ if is_proxied(path) => proxy::PREFIX,
        _ => "other",
    }
}

async fn route(
    req: Request<Incoming>,
    method: Method,
    path: &str,
    shared: &Shared,
) -> Response<Full<Bytes>> {
    let state = &shared.state;
    match (method, path) {
        (Method::GET, "/") => json_response(
            StatusCode::OK,
            &json!({"message": "perfwatch development backend"}),
        ),
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            text_response(StatusCode::OK, "OK")
        }
        (Method::GET, "/metrics") => json_response(StatusCode::OK, &state.snapshot()),
        (Method::GET, "/performance") => json_response(StatusCode::OK, &state.summary()),
        (Method::GET, "/prometheus") => with_body(
            StatusCode::OK,
            exposition::CONTENT_TYPE,
            shared.requests.render(&state.summary()),
        ),
        (Method::POST, "/update-metrics") => {
            let update: MetricsUpdate = match read_json(req).await {
                Ok(update) => update,
                Err(response) => return response,
            };
            match state.update_metrics(update) {
                Ok(summary) => json_response(
                    StatusCode::OK,
                    &json!({"status": "success", "message": "Metrics updated", "metrics": summary}),
                ),
                Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
            }
        }
        (Method::POST, "/optimize") => {
            let body: OptimizeBody = match read_json(req).await {
                Ok(body) => body,
                Err(response) => return response,
            };
            let Some(kind) = body.kind else {
                return error_response(StatusCode::BAD_REQUEST, "Optimization type is required");
            };
            match kind.parse::<OptimizationKind>() {
                Ok(kind) => {
                    let response = state.optimize(kind);
                    info!(kind = %kind, "optimization simulated");
                    json_response(StatusCode::OK, &response)
                }
                Err(e) => error_response(StatusCode::BAD_REQUEST, &e),
            }
        }
        (Method::GET, "/settings") => json_response(StatusCode::OK, &state.settings()),
        (Method::PUT, "/settings") => {
            let settings: Settings = match read_json(req).await {
                Ok(settings) => settings,
                Err(response) => return response,
            };
            match state.replace_settings(settings) {
                Ok(()) => {
                    info!("settings stored");
                    json_response(StatusCode::OK, &json!({"status": "success"}))
                }
                Err(e) => {
                    warn!(error = %e, "settings rejected");
                    error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string())
                }
            }
        }
        (Method::OPTIONS, _) => preflight_response(),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Read and decode a JSON body; the error is the response to send.
async fn read_json<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let bytes = collect_body(req.into_body(), MAX_BODY_BYTES).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Malformed JSON: {}", e)))
}

/// Buffer a request body of at most `limit` bytes.
///
/// Oversized bodies become `413`, unreadable ones `400`.
pub(crate) async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit, "request body too large");
            Err(text_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"))
        }
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            Err(text_response(StatusCode::BAD_REQUEST, "Unreadable request body"))
        }
    }
}

fn with_body(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub(crate) fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    with_body(status, "text/plain", body)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_body(status, "application/json", bytes),
        Err(e) => {
            error!(error = %e, "failed to encode response");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// `{"detail": ...}` error body.
fn error_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "detail": detail }))
}

fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = with_body(StatusCode::NO_CONTENT, "text/plain", Bytes::new());
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}
