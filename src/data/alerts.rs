//! Alerts, alert rules and client-side filtering.

use serde::{Deserialize, Serialize};

use super::snapshot::MetricsSnapshot;
use crate::settings::Thresholds;

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Whether an alert still needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }
}

/// A single alert row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: String,
    pub status: AlertStatus,
    /// Set on alerts raised by [`AlertBook::evaluate`].
    #[serde(skip)]
    pub metric: Option<WatchedMetric>,
}

/// Which alerts the table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertFilter {
    #[default]
    All,
    Active,
    Resolved,
}

impl AlertFilter {
    pub fn next(self) -> Self {
        match self {
            AlertFilter::All => AlertFilter::Active,
            AlertFilter::Active => AlertFilter::Resolved,
            AlertFilter::Resolved => AlertFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertFilter::All => "All Alerts",
            AlertFilter::Active => "Active",
            AlertFilter::Resolved => "Resolved",
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        match self {
            AlertFilter::All => true,
            AlertFilter::Active => alert.status == AlertStatus::Active,
            AlertFilter::Resolved => alert.status == AlertStatus::Resolved,
        }
    }
}

/// Which metric a rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedMetric {
    Lcp,
    Tbt,
    Inp,
}

impl WatchedMetric {
    pub fn label(&self) -> &'static str {
        match self {
            WatchedMetric::Lcp => "LCP",
            WatchedMetric::Tbt => "TBT",
            WatchedMetric::Inp => "INP",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            WatchedMetric::Lcp => "s",
            WatchedMetric::Tbt | WatchedMetric::Inp => "ms",
        }
    }

    fn latest(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        match self {
            WatchedMetric::Lcp => snapshot.latest_lcp(),
            WatchedMetric::Tbt => snapshot.latest_tbt(),
            WatchedMetric::Inp => snapshot.latest_inp(),
        }
    }
}

/// "metric > limit" rule derived from the thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRule {
    pub metric: WatchedMetric,
    pub limit: f64,
}

impl AlertRule {
    /// One rule per threshold.
    pub fn from_thresholds(thresholds: &Thresholds) -> [AlertRule; 3] {
        [
            AlertRule {
                metric: WatchedMetric::Lcp,
                limit: thresholds.lcp,
            },
            AlertRule {
                metric: WatchedMetric::Tbt,
                limit: thresholds.tbt,
            },
            AlertRule {
                metric: WatchedMetric::Inp,
                limit: thresholds.inp,
            },
        ]
    }

    pub fn describe(&self) -> String {
        format!("{} > {}{}", self.metric.label(), self.limit, self.metric.unit())
    }

    /// The offending value, if the latest sample breaks the rule.
    pub fn breach(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        self.metric.latest(snapshot).filter(|v| *v > self.limit)
    }

    fn alert_message(&self, value: f64) -> String {
        format!(
            "{} {}{} exceeds {}{}",
            self.metric.label(),
            value,
            self.metric.unit(),
            self.limit,
            self.metric.unit()
        )
    }
}

const DEGRADATION_KIND: &str = "Performance Degradation";

/// The alert list shown by the alerts view.
#[derive(Debug, Clone)]
pub struct AlertBook {
    alerts: Vec<Alert>,
    next_id: u64,
}

impl Default for AlertBook {
    fn default() -> Self {
        Self::with_samples()
    }
}

impl AlertBook {
    pub fn new(alerts: Vec<Alert>) -> Self {
        let next_id = alerts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        Self { alerts, next_id }
    }

    /// The two sample alerts the dashboard starts with.
    pub fn with_samples() -> Self {
        Self::new(vec![
            Alert {
                id: 1,
                kind: DEGRADATION_KIND.to_string(),
                severity: Severity::High,
                message: "LCP increased by 200ms".to_string(),
                timestamp: "2024-02-14 10:30".to_string(),
                status: AlertStatus::Active,
                metric: None,
            },
            Alert {
                id: 2,
                kind: "Resource Warning".to_string(),
                severity: Severity::Medium,
                message: "Large images detected".to_string(),
                timestamp: "2024-02-14 10:35".to_string(),
                status: AlertStatus::Resolved,
                metric: None,
            },
        ])
    }

    pub fn all(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn filtered(&self, filter: AlertFilter) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| filter.matches(a)).collect()
    }

    pub fn active_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.status == AlertStatus::Active).count()
    }

    pub fn resolved_count(&self) -> usize {
        self.alerts.len() - self.active_count()
    }

    /// Mark an alert resolved. Returns `false` if it was not active.
    pub fn resolve(&mut self, id: u64) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if alert.status == AlertStatus::Active => {
                alert.status = AlertStatus::Resolved;
                true
            }
            _ => false,
        }
    }

    /// Raise an alert for every rule the latest samples break.
    ///
    /// A metric that already has an active alert raised by this check is
    /// skipped. Returns the number of new alerts.
    pub fn evaluate(&mut self, snapshot: &MetricsSnapshot, thresholds: &Thresholds, now: &str) -> usize {
        let mut raised = 0;
        for rule in AlertRule::from_thresholds(thresholds) {
            let Some(value) = rule.breach(snapshot) else {
                continue;
            };

            let already_active = self
                .alerts
                .iter()
                .any(|a| a.status == AlertStatus::Active && a.metric == Some(rule.metric));
            if already_active {
                continue;
            }

            self.alerts.push(Alert {
                id: self.next_id,
                kind: DEGRADATION_KIND.to_string(),
                severity: Severity::High,
                message: rule.alert_message(value),
                timestamp: now.to_string(),
                status: AlertStatus::Active,
                metric: Some(rule.metric),
            });
            self.next_id += 1;
            raised += 1;
        }
        raised
    }
}
