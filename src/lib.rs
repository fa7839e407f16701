//! # perfwatch
//!
//! A terminal dashboard for web-performance metrics.
//!
//! The dashboard polls a metrics backend for Core Web Vitals (LCP, TBT, INP)
//! and a performance score, charts them, raises alerts when values cross the
//! configured thresholds, triggers optimizations and edits the backend's
//! settings. A development backend serving the same API is included.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          Application                           │
//! │  ┌─────────┐   AppEvent   ┌─────────┐         ┌──────────┐     │
//! │  │ poller  │─────────────▶│   app   │────────▶│    ui    │     │
//! │  │ (timer) │              │ (state) │         │(ratatui) │     │
//! │  └────┬────┘              └────┬────┘         └──────────┘     │
//! │       │                        │  settings ◀── SettingsStore   │
//! │       ▼                        ▼                               │
//! │  ┌──────────────────────────────────┐                          │
//! │  │ client: MetricsFetcher / Backend │◀── HttpBackend           │
//! │  └──────────────────────────────────┘                          │
//! └───────────────────────────┬────────────────────────────────────┘
//!                             │ HTTP
//!                     ┌───────▼───────┐
//!                     │    server     │──▶ /grafana/* proxy
//!                     └───────────────┘
//! ```
//!
//! - **[`app`]**: view navigation, per-view screen state and async results
//! - **[`poller`]**: periodic `/metrics` fetches bound to the performance view
//! - **[`client`]**: the [`Backend`] trait and its HTTP implementation
//! - **[`settings`]**: the settings model and its save-state machine
//! - **[`data`]**: snapshots, alerts and optimization history
//! - **[`ui`]**: rendering of the four views
//! - **[`server`]**: the development backend
//!
//! ## Usage
//!
//! ```bash
//! # Run the development backend
//! perfwatch --serve 127.0.0.1:8000
//!
//! # Watch it
//! perfwatch --backend http://127.0.0.1:8000 --refresh 5s
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use perfwatch::{App, HttpBackend};
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(HttpBackend::new("http://localhost:8000").unwrap());
//! let mut app = App::new(backend, Duration::from_secs(5));
//! app.process_events();
//! # });
//! ```
//!
//! ### Editing settings
//!
//! ```
//! use perfwatch::{SettingValue, Settings, SettingsPath};
//!
//! let settings = Settings::default()
//!     .with(SettingsPath::ThresholdsLcp, SettingValue::Number(3.0))
//!     .unwrap();
//! assert_eq!(settings.thresholds.lcp, 3.0);
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod data;
pub mod events;
pub mod logging;
pub mod poller;
pub mod server;
pub mod settings;
pub mod ui;

pub use app::{App, View};
pub use client::{Backend, ClientError, HttpBackend, MetricsFetcher};
pub use config::AppConfig;
pub use data::{
    Alert, AlertBook, MetricPoint, MetricsSnapshot, OptimizationHistory, OptimizationKind,
    OptimizeResponse, PerformanceSummary, ScorePoint,
};
pub use poller::{PollEvent, Poller};
pub use settings::{SaveState, SettingValue, Settings, SettingsError, SettingsPath, SettingsStore};
