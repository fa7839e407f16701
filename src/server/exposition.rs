//! Prometheus text exposition for the development backend.
//!
//! Served on `GET /prometheus`; `/metrics` stays the JSON snapshot the
//! dashboard polls.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

use parking_lot::Mutex;

use crate::data::PerformanceSummary;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Latency histogram bucket bounds in seconds.
const BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Default, Clone)]
struct Series {
    count: u64,
    sum: f64,
    /// Non-cumulative per-bucket counts; cumulated when rendered.
    buckets: [u64; BUCKETS.len()],
}

/// Request counter and latency histogram keyed by `(method, endpoint)`.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    series: Mutex<BTreeMap<(String, String), Series>>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one handled request.
    pub fn observe(&self, method: &str, endpoint: &str, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        let mut series = self.series.lock();
        let entry = series
            .entry((method.to_string(), endpoint.to_string()))
            .or_default();
        entry.count += 1;
        entry.sum += seconds;
        if let Some(i) = BUCKETS.iter().position(|bound| seconds <= *bound) {
            entry.buckets[i] += 1;
        }
    }

    /// Requests recorded for one label pair.
    pub fn request_count(&self, method: &str, endpoint: &str) -> u64 {
        self.series
            .lock()
            .get(&(method.to_string(), endpoint.to_string()))
            .map_or(0, |s| s.count)
    }

    /// Render request metrics and the current performance gauges.
    pub fn render(&self, summary: &PerformanceSummary) -> String {
        let series = self.series.lock().clone();
        let mut out = String::new();

        out.push_str("# HELP http_requests_total Total HTTP requests\n");
        out.push_str("# TYPE http_requests_total counter\n");
        for ((method, endpoint), s) in &series {
            let _ = writeln!(
                out,
                "http_requests_total{{{}}} {}",
                labels(method, endpoint),
                s.count
            );
        }

        out.push_str("# HELP request_latency_seconds Request latency in seconds\n");
        out.push_str("# TYPE request_latency_seconds histogram\n");
        for ((method, endpoint), s) in &series {
            let labels = labels(method, endpoint);
            let mut cumulative = 0;
            for (bound, hits) in BUCKETS.iter().zip(s.buckets.iter()) {
                cumulative += hits;
                let _ = writeln!(
                    out,
                    "request_latency_seconds_bucket{{{},le=\"{}\"}} {}",
                    labels, bound, cumulative
                );
            }
            let _ = writeln!(
                out,
                "request_latency_seconds_bucket{{{},le=\"+Inf\"}} {}",
                labels, s.count
            );
            let _ = writeln!(out, "request_latency_seconds_sum{{{}}} {}", labels, s.sum);
            let _ = writeln!(out, "request_latency_seconds_count{{{}}} {}", labels, s.count);
        }

        gauge(&mut out, "performance_score", "Current performance score", summary.score);
        gauge(
            &mut out,
            "largest_contentful_paint_seconds",
            "Largest Contentful Paint in seconds",
            summary.lcp,
        );
        gauge(
            &mut out,
            "total_blocking_time_seconds",
            "Total Blocking Time in seconds",
            summary.tbt,
        );
        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: f64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);
    let _ = writeln!(out, "{} {}", name, value);
}

fn labels(method: &str, endpoint: &str) -> String {
    format!(
        "method=\"{}\",endpoint=\"{}\"",
        escape_label_value(method),
        escape_label_value(endpoint)
    )
}

fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::INITIAL_SUMMARY;

    #[test]
    fn test_counter_and_histogram() {
        let metrics = RequestMetrics::new();
        metrics.observe("GET", "/performance", Duration::from_millis(3));
        metrics.observe("GET", "/performance", Duration::from_millis(300));
        assert_eq!(metrics.request_count("GET", "/performance"), 2);
        assert_eq!(metrics.request_count("POST", "/optimize"), 0);

        let text = metrics.render(&INITIAL_SUMMARY);
        assert!(text.contains("# TYPE http_requests_total counter"));
        assert!(text.contains("http_requests_total{method=\"GET\",endpoint=\"/performance\"} 2"));
        assert!(text.contains(
            "request_latency_seconds_bucket{method=\"GET\",endpoint=\"/performance\",le=\"0.005\"} 1"
        ));
        assert!(text.contains(
            "request_latency_seconds_bucket{method=\"GET\",endpoint=\"/performance\",le=\"0.25\"} 1"
        ));
        assert!(text.contains(
            "request_latency_seconds_bucket{method=\"GET\",endpoint=\"/performance\",le=\"0.5\"} 2"
        ));
        assert!(text.contains(
            "request_latency_seconds_bucket{method=\"GET\",endpoint=\"/performance\",le=\"+Inf\"} 2"
        ));
        assert!(text.contains(
            "request_latency_seconds_count{method=\"GET\",endpoint=\"/performance\"} 2"
        ));
    }

    #[test]
    fn test_gauges_follow_summary() {
        let text = RequestMetrics::new().render(&INITIAL_SUMMARY);
        assert!(text.contains("performance_score 92\n"));
        assert!(text.contains("largest_contentful_paint_seconds 2.2\n"));
        assert!(text.contains("total_blocking_time_seconds 0.26\n"));
    }

    #[test]
    fn test_slow_requests_only_in_inf_bucket() {
        let metrics = RequestMetrics::new();
        metrics.observe("GET", "/", Duration::from_secs(30));
        let text = metrics.render(&INITIAL_SUMMARY);
        assert!(text.contains("request_latency_seconds_bucket{method=\"GET\",endpoint=\"/\",le=\"10\"} 0"));
        assert!(text.contains("request_latency_seconds_bucket{method=\"GET\",endpoint=\"/\",le=\"+Inf\"} 1"));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("a\"b"), "a\\\"b");
        assert_eq!(escape_label_value("a\\b"), "a\\\\b");
    }
}
