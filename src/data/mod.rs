//! Data models for everything the dashboard displays.
//!
//! ## Submodules
//!
//! - [`snapshot`]: The metrics payload served by `/metrics` and its validation
//! - [`alerts`]: Alerts, alert rules and filtering
//! - [`optimization`]: Optimization requests, responses and history
//! - [`duration`]: Parsing of interval strings (e.g., "5s", "15m") and elapsed-time formatting
//!
//! ## Data Flow
//!
//! ```text
//! GET /metrics (raw JSON)
//!        │
//!        ▼
//! MetricsSnapshot::decode()  ── rejected ──▶ prior snapshot kept
//!        │
//!        ├──▶ PerformanceView (replaces the snapshot wholesale)
//!        │
//!        └──▶ AlertBook::evaluate() (threshold breaches)
//! ```

pub mod alerts;
pub mod duration;
pub mod optimization;
pub mod snapshot;

pub use alerts::{Alert, AlertBook, AlertFilter, AlertRule, AlertStatus, Severity, WatchedMetric};
pub use optimization::{
    OptimizationHistory, OptimizationKind, OptimizationRecord, OptimizationStatus,
    OptimizeRequest, OptimizeResponse, PerformanceSummary,
};
pub use snapshot::{MetricPoint, MetricsSnapshot, ScorePoint, SnapshotError};
