//! Backend client abstraction.
//!
//! The dashboard only depends on the [`MetricsFetcher`] and [`Backend`]
//! traits; [`HttpBackend`] is the production implementation talking to the
//! HTTP API, and tests substitute in-memory fakes.

mod error;
mod http;

pub use error::ClientError;
pub use http::HttpBackend;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::data::{MetricsSnapshot, OptimizationKind, OptimizeResponse};
use crate::settings::Settings;

/// Source of metrics snapshots for the poller.
///
/// # Example
///
/// ```no_run
/// use perfwatch::{HttpBackend, MetricsFetcher};
///
/// # tokio_test::block_on(async {
/// let backend = HttpBackend::new("http://localhost:8000").unwrap();
/// match backend.fetch_metrics().await {
///     Ok(snapshot) => println!("{} LCP samples", snapshot.lcp.len()),
///     Err(e) => eprintln!("poll failed: {}", e),
/// }
/// # });
/// ```
#[async_trait]
pub trait MetricsFetcher: Send + Sync + Debug {
    /// Fetch, decode and validate one snapshot.
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError>;

    /// Returns a human-readable description of the endpoint.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;
}

/// The full backend surface used by the dashboard.
#[async_trait]
pub trait Backend: MetricsFetcher {
    /// Ask the backend to run an optimization.
    async fn optimize(&self, kind: OptimizationKind) -> Result<OptimizeResponse, ClientError>;

    /// Persist the full settings document.
    async fn save_settings(&self, settings: &Settings) -> Result<(), ClientError>;
}
