//! Periodic metrics polling.
//!
//! A [`Poller`] owns one background task that fetches a snapshot right away
//! and then once per interval. Results are handed to a callback. The handle is
//! the only way to keep the task alive: [`Poller::stop`] or dropping the handle
//! cancels the timer, and any fetch that completes afterwards is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::client::MetricsFetcher;
use crate::data::MetricsSnapshot;

/// Shortest interval the poller accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A valid snapshot arrived and should replace the current one.
    Updated(MetricsSnapshot),
    /// The poll failed; the current snapshot stays as it is.
    Failed(String),
}

/// Handle to a running poll loop.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use perfwatch::{HttpBackend, Poller};
///
/// # tokio_test::block_on(async {
/// let backend = Arc::new(HttpBackend::new("http://localhost:8000").unwrap());
/// let poller = Poller::start(backend, Duration::from_secs(5), |snapshot| {
///     println!("{} LCP samples", snapshot.lcp.len());
/// });
/// // Dropping the handle stops polling.
/// drop(poller);
/// # });
/// ```
#[derive(Debug)]
pub struct Poller {
    live: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Poller {
    /// Start polling; `on_update` receives every valid snapshot.
    ///
    /// Failures are logged and skipped.
    pub fn start<F, U>(fetcher: Arc<F>, interval: Duration, mut on_update: U) -> Self
    where
        F: MetricsFetcher + ?Sized + 'static,
        U: FnMut(MetricsSnapshot) + Send + 'static,
    {
        Self::start_with_events(fetcher, interval, move |event| {
            if let PollEvent::Updated(snapshot) = event {
                on_update(snapshot);
            }
        })
    }

    /// Start polling; `on_event` receives successes and failures.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_with_events<F, E>(fetcher: Arc<F>, interval: Duration, mut on_event: E) -> Self
    where
        F: MetricsFetcher + ?Sized + 'static,
        E: FnMut(PollEvent) + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        let live = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());

        let task_live = live.clone();
        let task_wake = wake.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately, so the first poll is eager.
                let woken = tokio::select! {
                    _ = ticker.tick() => false,
                    _ = task_wake.notified() => true,
                };
                if woken {
                    ticker.reset();
                }

                if !task_live.load(Ordering::Acquire) {
                    break;
                }

                let outcome = fetcher.fetch_metrics().await;

                if !task_live.load(Ordering::Acquire) {
                    debug!(source = fetcher.description(), "discarding poll result after stop");
                    break;
                }

                match outcome {
                    Ok(snapshot) => on_event(PollEvent::Updated(snapshot)),
                    Err(e) => {
                        warn!(source = fetcher.description(), error = %e, "metrics poll failed");
                        on_event(PollEvent::Failed(e.to_string()));
                    }
                }
            }
        });

        Self {
            live,
            wake,
            task: Some(task),
            interval,
        }
    }

    /// Stop polling. Safe to call more than once.
    pub fn stop(&mut self) {
        self.live.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("poller stopped");
        }
    }

    /// Poll immediately and restart the interval from now.
    pub fn poll_now(&self) {
        if self.is_running() {
            self.wake.notify_one();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Returns queued results, then empty snapshots forever.
    #[derive(Debug, Default)]
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<MetricsSnapshot, ClientError>>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<MetricsSnapshot, ClientError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl MetricsFetcher for ScriptedFetcher {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
            self.script.lock().pop_front().unwrap_or_else(|| Ok(MetricsSnapshot::default()))
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }

    /// Blocks every fetch until released.
    #[derive(Debug, Default)]
    struct GatedFetcher {
        started: Notify,
        gate: Notify,
    }

    #[async_trait]
    impl MetricsFetcher for GatedFetcher {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
            self.started.notify_one();
            self.gate.notified().await;
            Ok(MetricsSnapshot::default())
        }

        fn description(&self) -> &str {
            "gated"
        }
    }

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |item| sink.lock().push(item))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_is_immediate_then_waits_for_interval() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let _poller = Poller::start(fetcher, Duration::from_millis(5000), sink);

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0], MetricsSnapshot::default());

        time::sleep(Duration::from_millis(4_990)).await;
        assert_eq!(seen.lock().len(), 1);

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_interval_means_no_more_updates() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let mut poller = Poller::start(fetcher, Duration::from_millis(5000), sink);

        poller.stop();
        let at_stop = seen.lock().len();
        assert!(!poller.is_running());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(seen.lock().len(), at_stop);
        assert_eq!(at_stop, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut poller = Poller::start(fetcher, Duration::from_millis(100), |_| {});
        poller.stop();
        poller.stop();
        poller.poll_now();
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_loop_continues() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(ClientError::Timeout),
            Ok(MetricsSnapshot::default()),
        ]));
        let (seen, sink) = recorder::<PollEvent>();
        let _poller = Poller::start_with_events(fetcher, Duration::from_millis(1000), sink);

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(seen.lock().as_slice(), &[PollEvent::Failed("Request timed out".to_string())]);

        time::sleep(Duration::from_millis(1000)).await;
        let events = seen.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], PollEvent::Updated(MetricsSnapshot::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_passed_to_update_callback() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(ClientError::Timeout)]));
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let _poller = Poller::start(fetcher, Duration::from_millis(1000), sink);

        time::sleep(Duration::from_millis(1)).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_is_discarded_after_stop() {
        let fetcher = Arc::new(GatedFetcher::default());
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let mut poller = Poller::start(fetcher.clone(), Duration::from_millis(1000), sink);

        fetcher.started.notified().await;
        poller.stop();
        fetcher.gate.notify_one();

        time::sleep(Duration::from_secs(5)).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let poller = Poller::start(fetcher, Duration::from_millis(100), sink);

        time::sleep(Duration::from_millis(1)).await;
        drop(poller);
        let at_drop = seen.lock().len();

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(seen.lock().len(), at_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_now_fetches_early() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let (seen, sink) = recorder::<MetricsSnapshot>();
        let poller = Poller::start(fetcher, Duration::from_millis(5000), sink);

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(seen.lock().len(), 1);

        poller.poll_now();
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(seen.lock().len(), 2);

        // The interval restarted at the manual poll.
        time::sleep(Duration::from_millis(4_990)).await;
        assert_eq!(seen.lock().len(), 2);
    }
}
