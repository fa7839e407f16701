//! Optimization requests and their history.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An optimization the backend can run on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationKind {
    Images,
    Css,
    Js,
}

impl OptimizationKind {
    pub const ALL: [OptimizationKind; 3] =
        [OptimizationKind::Images, OptimizationKind::Css, OptimizationKind::Js];

    /// Value of the `type` field in `POST /optimize`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationKind::Images => "images",
            OptimizationKind::Css => "css",
            OptimizationKind::Js => "js",
        }
    }

    /// Label used in the history table.
    pub fn title(&self) -> &'static str {
        match self {
            OptimizationKind::Images => "Image Optimization",
            OptimizationKind::Css => "CSS Minification",
            OptimizationKind::Js => "JavaScript Minification",
        }
    }

    /// Label used on the action list.
    pub fn action(&self) -> &'static str {
        match self {
            OptimizationKind::Images => "Optimize Images",
            OptimizationKind::Css => "Minify CSS",
            OptimizationKind::Js => "Minify JavaScript",
        }
    }
}

impl fmt::Display for OptimizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown optimization type: {}", s))
    }
}

/// Body of `POST /optimize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Current headline values, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub score: f64,
    /// Seconds.
    pub lcp: f64,
    /// Seconds.
    pub tbt: f64,
    /// Seconds.
    pub inp: f64,
}

/// Response of `POST /optimize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_metrics: Option<PerformanceSummary>,
}

/// Progress of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationStatus {
    Completed,
    InProgress,
    Failed,
}

impl OptimizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStatus::Completed => "completed",
            OptimizationStatus::InProgress => "in-progress",
            OptimizationStatus::Failed => "failed",
        }
    }
}

/// One row of the optimization history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: OptimizationStatus,
    pub impact: String,
    pub timestamp: String,
    pub details: String,
}

/// Maximum number of history rows to keep.
const MAX_HISTORY_SIZE: usize = 100;

/// Optimization history shown by the optimization view, oldest first.
#[derive(Debug, Clone)]
pub struct OptimizationHistory {
    records: VecDeque<OptimizationRecord>,
    next_id: u64,
    /// Last score reported by the backend, used to compute impact.
    last_score: Option<f64>,
}

impl Default for OptimizationHistory {
    fn default() -> Self {
        Self::with_samples()
    }
}

impl OptimizationHistory {
    pub fn new(records: Vec<OptimizationRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let skip = records.len().saturating_sub(MAX_HISTORY_SIZE);
        Self {
            records: records.into_iter().skip(skip).collect(),
            next_id,
            last_score: None,
        }
    }

    /// The two sample rows the dashboard starts with.
    pub fn with_samples() -> Self {
        Self::new(vec![
            OptimizationRecord {
                id: 1,
                kind: OptimizationKind::Images.title().to_string(),
                status: OptimizationStatus::Completed,
                impact: "+5 points".to_string(),
                timestamp: "2024-02-14 10:30".to_string(),
                details: "Compressed 15 images".to_string(),
            },
            OptimizationRecord {
                id: 2,
                kind: OptimizationKind::Css.title().to_string(),
                status: OptimizationStatus::InProgress,
                impact: "Pending".to_string(),
                timestamp: "2024-02-14 10:35".to_string(),
                details: "Processing CSS files".to_string(),
            },
        ])
    }

    pub fn records(&self) -> &VecDeque<OptimizationRecord> {
        &self.records
    }

    pub fn last_score(&self) -> Option<f64> {
        self.last_score
    }

    /// Append the backend's answer as a new history row.
    pub fn append(
        &mut self,
        kind: OptimizationKind,
        response: OptimizeResponse,
        timestamp: String,
    ) -> &OptimizationRecord {
        let status = match response.status.as_str() {
            "success" | "completed" => OptimizationStatus::Completed,
            "in-progress" | "pending" => OptimizationStatus::InProgress,
            _ => OptimizationStatus::Failed,
        };

        let new_score = response.new_metrics.map(|m| m.score);
        let impact = match (self.last_score, new_score) {
            (Some(before), Some(after)) => format_impact(after - before),
            (None, Some(_)) => "Measured".to_string(),
            (_, None) => "Pending".to_string(),
        };
        if new_score.is_some() {
            self.last_score = new_score;
        }

        self.records.push_back(OptimizationRecord {
            id: self.next_id,
            kind: kind.title().to_string(),
            status,
            impact,
            timestamp,
            details: response.message,
        });
        self.next_id += 1;
        if self.records.len() > MAX_HISTORY_SIZE {
            self.records.pop_front();
        }

        &self.records[self.records.len() - 1]
    }

    /// Record a score seen elsewhere (e.g. the metrics feed) as the baseline.
    pub fn observe_score(&mut self, score: f64) {
        self.last_score = Some(score);
    }
}

fn format_impact(delta: f64) -> String {
    if delta.abs() < f64::EPSILON {
        "No change".to_string()
    } else {
        format!("{:+} points", delta)
    }
}
