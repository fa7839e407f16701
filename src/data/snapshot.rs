//! Metrics snapshot types.
//!
//! These types match the JSON body served by the backend's `/metrics`
//! endpoint. A snapshot is always accepted or rejected as a whole: every
//! series must be present and every point must pass [`MetricsSnapshot::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A complete metrics state value.
///
/// The four series are independent; nothing requires them to share
/// timestamps or lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Overall performance score history.
    pub performance: Vec<ScorePoint>,
    /// Largest Contentful Paint samples, in seconds.
    pub lcp: Vec<MetricPoint>,
    /// Total Blocking Time samples, in milliseconds.
    pub tbt: Vec<MetricPoint>,
    /// Interaction to Next Paint samples, in milliseconds.
    pub inp: Vec<MetricPoint>,
}

/// One point of the performance score history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub date: String,
    pub score: f64,
}

/// One timestamped metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: String,
    pub value: f64,
}

/// Reasons a metrics payload is refused.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The body is not JSON of the expected shape (including missing series).
    #[error("malformed metrics payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A score is not a finite number in `0..=100`.
    #[error("performance[{index}].score out of range: {score}")]
    ScoreOutOfRange { index: usize, score: f64 },

    /// A metric value is negative or not finite.
    #[error("{series}[{index}].value invalid: {value}")]
    InvalidValue {
        series: &'static str,
        index: usize,
        value: f64,
    },
}

impl MetricsSnapshot {
    /// Decode and validate a raw response body.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check every point of every series.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (index, point) in self.performance.iter().enumerate() {
            if !point.score.is_finite() || !(0.0..=100.0).contains(&point.score) {
                return Err(SnapshotError::ScoreOutOfRange {
                    index,
                    score: point.score,
                });
            }
        }

        for (series, points) in [("lcp", &self.lcp), ("tbt", &self.tbt), ("inp", &self.inp)] {
            for (index, point) in points.iter().enumerate() {
                if !point.value.is_finite() || point.value < 0.0 {
                    return Err(SnapshotError::InvalidValue {
                        series,
                        index,
                        value: point.value,
                    });
                }
            }
        }

        Ok(())
    }

    /// True when no series has any data.
    pub fn is_empty(&self) -> bool {
        self.performance.is_empty() && self.lcp.is_empty() && self.tbt.is_empty() && self.inp.is_empty()
    }

    pub fn latest_score(&self) -> Option<f64> {
        self.performance.last().map(|p| p.score)
    }

    pub fn latest_lcp(&self) -> Option<f64> {
        self.lcp.last().map(|p| p.value)
    }

    pub fn latest_tbt(&self) -> Option<f64> {
        self.tbt.last().map(|p| p.value)
    }

    pub fn latest_inp(&self) -> Option<f64> {
        self.inp.last().map(|p| p.value)
    }
}
