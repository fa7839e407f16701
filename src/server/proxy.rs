//! `/grafana/*` passthrough.
//!
//! Requests are forwarded with their method, path suffix, query, headers and
//! body. Hop-by-hop headers are dropped in both directions.

use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderMap};
use hyper::{Request, Response, StatusCode};
use tracing::{debug, warn};

use super::{collect_body, text_response, MAX_BODY_BYTES};

/// Path prefix routed to the proxy.
pub const PREFIX: &str = "/grafana";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Forwards requests to the Grafana origin.
#[derive(Debug, Clone)]
pub struct GrafanaProxy {
    client: reqwest::Client,
    origin: String,
}

impl GrafanaProxy {
    pub fn new(origin: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Map `/grafana/<rest>?<query>` onto the origin.
    ///
    /// Returns `None` for paths outside the prefix.
    pub fn upstream_url(&self, path_and_query: &str) -> Option<String> {
        let rest = path_and_query.strip_prefix(PREFIX)?;
        if rest.is_empty() {
            return Some(format!("{}/", self.origin));
        }
        match rest.as_bytes()[0] {
            b'/' => Some(format!("{}{}", self.origin, rest)),
            b'?' => Some(format!("{}/{}", self.origin, rest)),
            _ => None,
        }
    }

    /// Forward one request. Upstream failures become `502 Bad Gateway`.
    pub async fn forward(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let Some(url) = self.upstream_url(&path_and_query) else {
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        };

        let (parts, body) = req.into_parts();
        let body = match collect_body(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(response) => return response,
        };

        debug!(method = %parts.method, url = %url, "proxying to grafana");
        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(strip_hop_by_hop(parts.headers))
            .body(body)
            .send()
            .await;

        let upstream = match upstream {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "grafana upstream unreachable");
                return text_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
            }
        };

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());
        let body = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to read grafana response");
                return text_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
            }
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in [
        header::CONNECTION,
        header::HOST,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
    // Recomputed from the buffered body
    headers.remove(header::CONTENT_LENGTH);
    headers
}
