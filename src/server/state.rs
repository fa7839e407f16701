//! In-memory state behind the development backend.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{
    MetricPoint, MetricsSnapshot, OptimizationKind, OptimizeResponse, PerformanceSummary,
    ScorePoint,
};
use crate::settings::{Settings, SettingsError};

/// Samples kept for `GET /metrics`.
const MAX_SAMPLES: usize = 60;

/// Lowest value an optimization can push LCP or TBT down to, in seconds.
const FLOOR_SECONDS: f64 = 0.1;

/// Values the backend starts with.
pub const INITIAL_SUMMARY: PerformanceSummary = PerformanceSummary {
    score: 92.0,
    lcp: 2.2,
    tbt: 0.26,
    inp: 0.185,
};

/// Body of `POST /update-metrics`. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub score: Option<f64>,
    pub lcp: Option<f64>,
    pub tbt: Option<f64>,
    pub inp: Option<f64>,
}

/// Why a metrics update was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdateError {
    #[error("{field} must be a finite, non-negative number, got {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(f64),
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: DateTime<Local>,
    summary: PerformanceSummary,
}

#[derive(Debug)]
struct Inner {
    current: PerformanceSummary,
    samples: VecDeque<Sample>,
    settings: Settings,
}

impl Inner {
    fn record(&mut self) {
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            at: Local::now(),
            summary: self.current,
        });
    }
}

/// Shared backend state.
#[derive(Debug)]
pub struct BackendState {
    inner: RwLock<Inner>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new(INITIAL_SUMMARY)
    }
}

impl BackendState {
    /// Start from `initial`, recorded as the first sample.
    pub fn new(initial: PerformanceSummary) -> Self {
        let mut inner = Inner {
            current: initial,
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            settings: Settings::default(),
        };
        inner.record();
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// `GET /performance`.
    pub fn summary(&self) -> PerformanceSummary {
        self.inner.read().current
    }

    /// `GET /metrics`: LCP in seconds, TBT and INP in milliseconds.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        let mut snapshot = MetricsSnapshot::default();
        for sample in &inner.samples {
            let time = sample.at.format("%H:%M:%S").to_string();
            let point = |value: f64| MetricPoint {
                timestamp: time.clone(),
                value: round3(value),
            };
            snapshot.performance.push(ScorePoint {
                date: sample.at.format("%Y-%m-%d %H:%M:%S").to_string(),
                score: sample.summary.score,
            });
            snapshot.lcp.push(point(sample.summary.lcp));
            snapshot.tbt.push(point(sample.summary.tbt * 1000.0));
            snapshot.inp.push(point(sample.summary.inp * 1000.0));
        }
        snapshot
    }

    /// `POST /update-metrics`: overwrite the fields present in `update`.
    pub fn update_metrics(&self, update: MetricsUpdate) -> Result<PerformanceSummary, UpdateError> {
        for (field, value) in [
            ("score", update.score),
            ("lcp", update.lcp),
            ("tbt", update.tbt),
            ("inp", update.inp),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(UpdateError::InvalidValue { field, value });
                }
            }
        }
        if let Some(score) = update.score.filter(|s| *s > 100.0) {
            return Err(UpdateError::ScoreOutOfRange(score));
        }

        let mut inner = self.inner.write();
        let current = &mut inner.current;
        current.score = update.score.unwrap_or(current.score);
        current.lcp = update.lcp.unwrap_or(current.lcp);
        current.tbt = update.tbt.unwrap_or(current.tbt);
        current.inp = update.inp.unwrap_or(current.inp);
        inner.record();
        Ok(inner.current)
    }

    /// `POST /optimize`: simulate the effect of an optimization.
    pub fn optimize(&self, kind: OptimizationKind) -> OptimizeResponse {
        let mut inner = self.inner.write();
        let current = &mut inner.current;
        match kind {
            OptimizationKind::Images => {
                current.score = (current.score + 2.0).min(100.0);
                current.lcp = round3((current.lcp - 0.2).max(FLOOR_SECONDS));
            }
            OptimizationKind::Css | OptimizationKind::Js => {
                current.score = (current.score + 1.0).min(100.0);
                current.tbt = round3((current.tbt - 0.1).max(FLOOR_SECONDS));
            }
        }
        inner.record();

        OptimizeResponse {
            status: "success".to_string(),
            message: format!("Optimization completed for {}", kind),
            new_metrics: Some(inner.current),
        }
    }

    /// `GET /settings`.
    pub fn settings(&self) -> Settings {
        self.inner.read().settings
    }

    /// `PUT /settings`. Invalid documents leave the stored settings untouched.
    pub fn replace_settings(&self, settings: Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.inner.write().settings = settings;
        Ok(())
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let state = BackendState::default();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.performance.len(), 1);
        assert_eq!(snapshot.latest_score(), Some(92.0));
        assert_eq!(snapshot.latest_lcp(), Some(2.2));
        assert_eq!(snapshot.latest_tbt(), Some(260.0));
        assert_eq!(snapshot.latest_inp(), Some(185.0));
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_image_optimization() {
        let state = BackendState::default();
        let response = state.optimize(OptimizationKind::Images);
        assert_eq!(response.status, "success");
        assert_eq!(response.message, "Optimization completed for images");
        let metrics = response.new_metrics.unwrap();
        assert_eq!(metrics.score, 94.0);
        assert_eq!(metrics.lcp, 2.0);
        assert_eq!(metrics.tbt, 0.26);
        assert_eq!(state.snapshot().lcp.len(), 2);
    }

    #[test]
    fn test_css_optimization_floors_tbt() {
        let state = BackendState::default();
        let first = state.optimize(OptimizationKind::Css).new_metrics.unwrap();
        assert_eq!(first.tbt, 0.16);
        let second = state.optimize(OptimizationKind::Js).new_metrics.unwrap();
        assert_eq!(second.tbt, 0.1);
        assert_eq!(second.score, 94.0);
    }

    #[test]
    fn test_score_is_capped() {
        let state = BackendState::new(PerformanceSummary {
            score: 99.0,
            ..INITIAL_SUMMARY
        });
        let metrics = state.optimize(OptimizationKind::Images).new_metrics.unwrap();
        assert_eq!(metrics.score, 100.0);
    }

    #[test]
    fn test_partial_update() {
        let state = BackendState::default();
        let summary = state
            .update_metrics(MetricsUpdate {
                lcp: Some(3.1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(summary.lcp, 3.1);
        assert_eq!(summary.score, 92.0);
        assert_eq!(state.snapshot().latest_lcp(), Some(3.1));
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let state = BackendState::default();
        let err = state
            .update_metrics(MetricsUpdate {
                tbt: Some(-1.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, UpdateError::InvalidValue { field: "tbt", .. }));
        assert!(state
            .update_metrics(MetricsUpdate {
                score: Some(101.0),
                ..Default::default()
            })
            .is_err());
        assert_eq!(state.summary(), INITIAL_SUMMARY);
    }

    #[test]
    fn test_samples_are_bounded() {
        let state = BackendState::default();
        for _ in 0..(MAX_SAMPLES + 10) {
            state.optimize(OptimizationKind::Css);
        }
        assert_eq!(state.snapshot().tbt.len(), MAX_SAMPLES);
    }

    #[test]
    fn test_invalid_settings_are_not_stored() {
        let state = BackendState::default();
        let mut settings = Settings::default();
        settings.thresholds.lcp = -1.0;
        assert!(state.replace_settings(settings).is_err());
        assert_eq!(state.settings(), Settings::default());

        settings.thresholds.lcp = 3.0;
        state.replace_settings(settings).unwrap();
        assert_eq!(state.settings().thresholds.lcp, 3.0);
    }
}
