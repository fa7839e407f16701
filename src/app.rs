//! Application state, view lifecycle and background results.
//!
//! Each view owns its state in a [`Screen`]. Switching views replaces the
//! screen, so the old state (and the performance view's poller) is dropped.
//! Background work reports back through a channel drained once per frame;
//! results tagged with an older mount generation are discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Backend;
use crate::data::{
    AlertBook, AlertFilter, MetricsSnapshot, OptimizationHistory, OptimizationKind,
    OptimizeResponse,
};
use crate::poller::{PollEvent, Poller};
use crate::settings::{SaveTicket, SettingValue, Settings, SettingsPath, SettingsStore, ValueKind};
use crate::ui::Theme;

/// How long a status bar message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Live metrics, polled from the backend.
    Performance,
    /// On-demand optimizations and their history.
    Optimization,
    /// Alert list, rules and channels.
    Alerts,
    /// Settings form.
    Settings,
}

impl View {
    pub const ALL: [View; 4] = [View::Performance, View::Optimization, View::Alerts, View::Settings];

    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Performance => View::Optimization,
            View::Optimization => View::Alerts,
            View::Alerts => View::Settings,
            View::Settings => View::Performance,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Performance => View::Settings,
            View::Optimization => View::Performance,
            View::Alerts => View::Optimization,
            View::Settings => View::Alerts,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Performance => "Performance",
            View::Optimization => "Optimization",
            View::Alerts => "Alerts",
            View::Settings => "Settings",
        }
    }

    /// Position in the tab bar.
    pub fn index(&self) -> usize {
        match self {
            View::Performance => 0,
            View::Optimization => 1,
            View::Alerts => 2,
            View::Settings => 3,
        }
    }
}

/// A result produced off the UI thread.
#[derive(Debug)]
pub enum AppEvent {
    /// Output of the performance view's poller.
    Poll { generation: u64, event: PollEvent },
    /// Answer to `POST /optimize`.
    Optimized {
        kind: OptimizationKind,
        result: Result<OptimizeResponse, String>,
    },
    /// Answer to `PUT /settings`.
    SettingsSaved {
        generation: u64,
        ticket: SaveTicket,
        result: Result<(), String>,
    },
}

/// State owned by a mounted performance view.
#[derive(Debug)]
pub struct PerformanceScreen {
    /// `None` until the first successful poll.
    pub snapshot: Option<MetricsSnapshot>,
    pub last_updated: Option<Instant>,
    /// Error of the latest poll, cleared by the next success.
    pub last_error: Option<String>,
    poller: Poller,
}

impl PerformanceScreen {
    fn new(poller: Poller) -> Self {
        Self {
            snapshot: None,
            last_updated: None,
            last_error: None,
            poller,
        }
    }

    /// Apply one poll outcome. Returns the new snapshot when it was replaced.
    fn apply(&mut self, event: PollEvent) -> Option<&MetricsSnapshot> {
        match event {
            PollEvent::Updated(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_updated = Some(Instant::now());
                self.last_error = None;
                self.snapshot.as_ref()
            }
            PollEvent::Failed(message) => {
                self.last_error = Some(message);
                None
            }
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }
}

/// State owned by a mounted optimization view.
#[derive(Debug, Default)]
pub struct OptimizationScreen {
    /// Index into [`OptimizationKind::ALL`].
    pub selected: usize,
    /// Optimization currently running, if any.
    pub pending: Option<OptimizationKind>,
}

impl OptimizationScreen {
    pub fn selected_kind(&self) -> OptimizationKind {
        OptimizationKind::ALL[self.selected.min(OptimizationKind::ALL.len() - 1)]
    }
}

/// State owned by a mounted alerts view.
#[derive(Debug, Default)]
pub struct AlertsScreen {
    pub filter: AlertFilter,
    /// Row in the filtered table.
    pub selected: usize,
}

/// State owned by a mounted settings view.
#[derive(Debug)]
pub struct SettingsScreen {
    pub store: SettingsStore,
    /// Index into [`SettingsPath::ALL`].
    pub selected: usize,
    /// Text being typed into a threshold field.
    pub editing: Option<String>,
    /// A save is in flight.
    pub saving: bool,
}

impl SettingsScreen {
    fn new(initial: Settings) -> Self {
        Self {
            store: SettingsStore::new(initial),
            selected: 0,
            editing: None,
            saving: false,
        }
    }

    pub fn selected_path(&self) -> SettingsPath {
        SettingsPath::ALL[self.selected.min(SettingsPath::ALL.len() - 1)]
    }
}

/// The mounted view and the state it owns.
#[derive(Debug)]
pub enum Screen {
    Performance(PerformanceScreen),
    Optimization(OptimizationScreen),
    Alerts(AlertsScreen),
    Settings(SettingsScreen),
}

impl Screen {
    pub fn view(&self) -> View {
        match self {
            Screen::Performance(_) => View::Performance,
            Screen::Optimization(_) => View::Optimization,
            Screen::Alerts(_) => View::Alerts,
            Screen::Settings(_) => View::Settings,
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub screen: Screen,

    // Survives view switches
    pub alerts: AlertBook,
    pub history: OptimizationHistory,
    /// Last settings the backend acknowledged; seeds new settings views.
    pub saved_settings: Settings,

    // UI
    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,

    backend: Arc<dyn Backend>,
    poll_interval: Duration,
    generation: u64,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    /// Create the app with the performance view mounted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn Backend>, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let saved_settings = Settings::default();
        let generation = 1;
        let screen = mount(
            View::Performance,
            generation,
            &backend,
            poll_interval,
            &events_tx,
            saved_settings,
        );

        Self {
            running: true,
            show_help: false,
            screen,
            alerts: AlertBook::with_samples(),
            history: OptimizationHistory::with_samples(),
            saved_settings,
            theme: Theme::from_choice(saved_settings.theme),
            status_message: None,
            backend,
            poll_interval,
            generation,
            events_tx,
            events_rx,
        }
    }

    /// Returns a description of the backend.
    pub fn source_description(&self) -> &str {
        self.backend.description()
    }

    pub fn current_view(&self) -> View {
        self.screen.view()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Switch to a specific view, tearing down the current one.
    pub fn set_view(&mut self, view: View) {
        if view == self.current_view() {
            return;
        }
        self.generation += 1;
        // The assignment drops the previous screen, stopping its poller.
        self.screen = mount(
            view,
            self.generation,
            &self.backend,
            self.poll_interval,
            &self.events_tx,
            self.saved_settings,
        );
        debug!(view = view.label(), generation = self.generation, "view mounted");
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.set_view(self.current_view().next());
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.set_view(self.current_view().prev());
    }

    /// Drain background results. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Poll { generation, event } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "discarding stale poll result");
                    return;
                }
                let Screen::Performance(screen) = &mut self.screen else {
                    return;
                };
                let Some(snapshot) = screen.apply(event) else {
                    return;
                };

                let raised =
                    self.alerts.evaluate(snapshot, &self.saved_settings.thresholds, &timestamp());
                if let Some(score) = snapshot.latest_score() {
                    self.history.observe_score(score);
                }
                if raised > 0 {
                    info!(raised, "threshold alerts raised");
                    self.set_status_message(format!("{} new alert(s)", raised));
                }
            }
            AppEvent::Optimized { kind, result } => {
                if let Screen::Optimization(screen) = &mut self.screen {
                    if screen.pending == Some(kind) {
                        screen.pending = None;
                    }
                }
                match result {
                    Ok(response) => {
                        let message = response.message.clone();
                        let record = self.history.append(kind, response, timestamp());
                        info!(kind = %kind, impact = %record.impact, "optimization finished");
                        self.set_status_message(message);
                    }
                    Err(e) => {
                        warn!(kind = %kind, error = %e, "optimization failed");
                        self.set_status_message(format!("Optimization failed: {}", e));
                    }
                }
            }
            AppEvent::SettingsSaved {
                generation,
                ticket,
                result,
            } => {
                let is_current = generation == self.generation;
                if let (true, Screen::Settings(screen)) = (is_current, &mut self.screen) {
                    screen.saving = false;
                }
                match result {
                    Ok(()) => {
                        self.saved_settings = ticket.settings;
                        self.theme = Theme::from_choice(ticket.settings.theme);
                        if let (true, Screen::Settings(screen)) = (is_current, &mut self.screen) {
                            screen.store.acknowledge(&ticket);
                        }
                        info!(revision = ticket.revision, "settings saved");
                        self.set_status_message("Settings saved".to_string());
                    }
                    Err(e) => {
                        warn!(error = %e, "settings save failed");
                        self.set_status_message(format!("Save failed: {}", e));
                    }
                }
            }
        }
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        let alert_count = self.filtered_alert_count();
        match &mut self.screen {
            Screen::Performance(_) => {}
            Screen::Optimization(screen) => {
                screen.selected = (screen.selected + 1).min(OptimizationKind::ALL.len() - 1);
            }
            Screen::Alerts(screen) => {
                screen.selected = (screen.selected + 1).min(alert_count.saturating_sub(1));
            }
            Screen::Settings(screen) => {
                if screen.editing.is_none() {
                    screen.selected = (screen.selected + 1).min(SettingsPath::ALL.len() - 1);
                }
            }
        }
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        match &mut self.screen {
            Screen::Performance(_) => {}
            Screen::Optimization(screen) => screen.selected = screen.selected.saturating_sub(1),
            Screen::Alerts(screen) => screen.selected = screen.selected.saturating_sub(1),
            Screen::Settings(screen) => {
                if screen.editing.is_none() {
                    screen.selected = screen.selected.saturating_sub(1);
                }
            }
        }
    }

    /// Enter: run, resolve, toggle or edit the selected item.
    pub fn activate(&mut self) {
        match self.current_view() {
            View::Performance => self.poll_now(),
            View::Optimization => {
                if let Screen::Optimization(screen) = &self.screen {
                    let kind = screen.selected_kind();
                    self.trigger_optimization(kind);
                }
            }
            View::Alerts => self.resolve_selected_alert(),
            View::Settings => self.activate_setting(),
        }
    }

    /// Ask the performance view's poller for an immediate poll.
    pub fn poll_now(&mut self) {
        if let Screen::Performance(screen) = &self.screen {
            screen.poller.poll_now();
            self.set_status_message("Refreshing...".to_string());
        }
    }

    /// Send `POST /optimize` in the background.
    pub fn trigger_optimization(&mut self, kind: OptimizationKind) {
        if let Screen::Optimization(screen) = &mut self.screen {
            if screen.pending.is_some() {
                return;
            }
            screen.pending = Some(kind);
        }

        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.optimize(kind).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Optimized { kind, result });
        });
        debug!(kind = %kind, "optimization requested");
    }

    fn filtered_alert_count(&self) -> usize {
        match &self.screen {
            Screen::Alerts(screen) => self.alerts.filtered(screen.filter).len(),
            _ => 0,
        }
    }

    /// Cycle All → Active → Resolved.
    pub fn cycle_alert_filter(&mut self) {
        if let Screen::Alerts(screen) = &mut self.screen {
            screen.filter = screen.filter.next();
            screen.selected = 0;
        }
    }

    /// Id of the alert under the cursor.
    pub fn selected_alert_id(&self) -> Option<u64> {
        let Screen::Alerts(screen) = &self.screen else {
            return None;
        };
        self.alerts.filtered(screen.filter).get(screen.selected).map(|a| a.id)
    }

    /// Mark the alert under the cursor resolved.
    pub fn resolve_selected_alert(&mut self) {
        let Some(id) = self.selected_alert_id() else {
            return;
        };
        if self.alerts.resolve(id) {
            info!(id, "alert resolved");
            let remaining = self.filtered_alert_count();
            if let Screen::Alerts(screen) = &mut self.screen {
                screen.selected = screen.selected.min(remaining.saturating_sub(1));
            }
            self.set_status_message(format!("Alert {} resolved", id));
        }
    }

    fn activate_setting(&mut self) {
        let Screen::Settings(screen) = &mut self.screen else {
            return;
        };
        if screen.editing.is_some() {
            self.commit_edit();
            return;
        }

        let path = screen.selected_path();
        let current = screen.store.current();
        match path.kind() {
            ValueKind::Number => {
                screen.editing = Some(current.get(path).to_string());
            }
            ValueKind::Bool | ValueKind::Choice => {
                if let Some(value) = current.cycled(path, true) {
                    let outcome = screen.store.update(path, value).map(|_| ());
                    if let Err(e) = outcome {
                        self.set_status_message(e.to_string());
                    }
                }
            }
        }
    }

    /// Cycle a choice field backwards (Backspace).
    pub fn cycle_setting_back(&mut self) {
        let Screen::Settings(screen) = &mut self.screen else {
            return;
        };
        let path = screen.selected_path();
        if path.kind() != ValueKind::Choice {
            return;
        }
        if let Some(value) = screen.store.current().cycled(path, false) {
            let outcome = screen.store.update(path, value).map(|_| ());
            if let Err(e) = outcome {
                self.set_status_message(e.to_string());
            }
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(&self.screen, Screen::Settings(screen) if screen.editing.is_some())
    }

    pub fn edit_push(&mut self, c: char) {
        if let Screen::Settings(SettingsScreen {
            editing: Some(buffer),
            ..
        }) = &mut self.screen
        {
            buffer.push(c);
        }
    }

    pub fn edit_pop(&mut self) {
        if let Screen::Settings(SettingsScreen {
            editing: Some(buffer),
            ..
        }) = &mut self.screen
        {
            buffer.pop();
        }
    }

    /// Leave edit mode, keeping the previous value.
    pub fn cancel_edit(&mut self) {
        if let Screen::Settings(screen) = &mut self.screen {
            screen.editing = None;
        }
    }

    /// Apply the edit buffer. Invalid input keeps the previous value.
    pub fn commit_edit(&mut self) {
        let Screen::Settings(screen) = &mut self.screen else {
            return;
        };
        let Some(buffer) = screen.editing.take() else {
            return;
        };
        let path = screen.selected_path();
        let outcome = screen.store.update_raw(path, &buffer).map(|_| ());
        if let Err(e) = outcome {
            debug!(path = %path, input = %buffer, "rejected settings input");
            self.set_status_message(e.to_string());
        }
    }

    /// Hand the current settings to the backend.
    ///
    /// The settings view stays dirty until the save is acknowledged.
    pub fn save_settings(&mut self) {
        let generation = self.generation;
        let Screen::Settings(screen) = &mut self.screen else {
            return;
        };
        if screen.saving {
            return;
        }
        let ticket = screen.store.begin_save();
        screen.saving = true;

        let backend = self.backend.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.save_settings(&ticket.settings).await.map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::SettingsSaved {
                generation,
                ticket,
                result,
            });
        });
        self.set_status_message("Saving settings...".to_string());
    }

    /// Current value of a settings leaf as shown in the form.
    pub fn setting_value(&self, path: SettingsPath) -> Option<SettingValue> {
        match &self.screen {
            Screen::Settings(screen) => Some(screen.store.current().get(path)),
            _ => None,
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

/// Build fresh state for `view`. Starts the poller for the performance view.
fn mount(
    view: View,
    generation: u64,
    backend: &Arc<dyn Backend>,
    poll_interval: Duration,
    events_tx: &mpsc::UnboundedSender<AppEvent>,
    saved_settings: Settings,
) -> Screen {
    match view {
        View::Performance => {
            let tx = events_tx.clone();
            let poller = Poller::start_with_events(backend.clone(), poll_interval, move |event| {
                let _ = tx.send(AppEvent::Poll { generation, event });
            });
            Screen::Performance(PerformanceScreen::new(poller))
        }
        View::Optimization => Screen::Optimization(OptimizationScreen::default()),
        View::Alerts => Screen::Alerts(AlertsScreen::default()),
        View::Settings => Screen::Settings(SettingsScreen::new(saved_settings)),
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MetricsFetcher};
    use crate::data::{MetricPoint, PerformanceSummary, ScorePoint};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct FakeBackend {
        snapshot: MetricsSnapshot,
        fail_save: bool,
        saved: Mutex<Vec<Settings>>,
    }

    #[async_trait]
    impl MetricsFetcher for FakeBackend {
        async fn fetch_metrics(&self) -> Result<MetricsSnapshot, ClientError> {
            Ok(self.snapshot.clone())
        }

        fn description(&self) -> &str {
            "fake"
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn optimize(&self, kind: OptimizationKind) -> Result<OptimizeResponse, ClientError> {
            Ok(OptimizeResponse {
                status: "success".to_string(),
                message: format!("Optimization completed for {}", kind),
                new_metrics: Some(PerformanceSummary {
                    score: 94.0,
                    lcp: 2.0,
                    tbt: 0.26,
                    inp: 0.185,
                }),
            })
        }

        async fn save_settings(&self, settings: &Settings) -> Result<(), ClientError> {
            if self.fail_save {
                return Err(ClientError::Status { status: 500 });
            }
            self.saved.lock().push(*settings);
            Ok(())
        }
    }

    fn slow_snapshot() -> MetricsSnapshot {
        let point = |value| {
            vec![MetricPoint {
                timestamp: "10:40".to_string(),
                value,
            }]
        };
        MetricsSnapshot {
            performance: vec![ScorePoint {
                date: "2024-02-14".to_string(),
                score: 88.0,
            }],
            lcp: point(3.1),
            tbt: point(120.0),
            inp: point(150.0),
        }
    }

    fn app_with(backend: FakeBackend) -> App {
        App::new(Arc::new(backend), Duration::from_secs(5))
    }

    /// Let spawned tasks run.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn settings_index(path: SettingsPath) -> usize {
        SettingsPath::ALL.iter().position(|p| *p == path).unwrap()
    }

    #[test]
    fn test_view_cycle() {
        let mut view = View::Performance;
        for _ in 0..4 {
            view = view.next();
        }
        assert_eq!(view, View::Performance);
        assert_eq!(View::Performance.prev(), View::Settings);
        assert_eq!(View::Alerts.index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_replaces_state_and_raises_alerts() {
        let mut app = app_with(FakeBackend {
            snapshot: slow_snapshot(),
            ..Default::default()
        });
        assert_eq!(app.alerts.active_count(), 1);

        settle().await;
        assert_eq!(app.process_events(), 1);

        let Screen::Performance(screen) = &app.screen else {
            panic!("expected performance view");
        };
        assert_eq!(screen.snapshot.as_ref(), Some(&slow_snapshot()));
        assert!(screen.last_error.is_none());
        // LCP 3.1s breaks the default 2.5s threshold.
        assert_eq!(app.alerts.active_count(), 2);
        assert_eq!(app.history.last_score(), Some(88.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_performance_stops_polling() {
        let mut app = app_with(FakeBackend::default());
        settle().await;
        app.process_events();

        app.set_view(View::Alerts);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(app.process_events(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_discarded() {
        let mut app = app_with(FakeBackend::default());
        let first_generation = app.generation;
        app.set_view(View::Alerts);
        app.set_view(View::Performance);

        app.events_tx
            .send(AppEvent::Poll {
                generation: first_generation,
                event: PollEvent::Updated(slow_snapshot()),
            })
            .unwrap();
        app.process_events();

        let Screen::Performance(screen) = &app.screen else {
            panic!("expected performance view");
        };
        assert_ne!(screen.snapshot.as_ref(), Some(&slow_snapshot()));
        assert_eq!(app.alerts.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_snapshot() {
        let mut app = app_with(FakeBackend::default());
        settle().await;
        app.process_events();

        let generation = app.generation;
        app.events_tx
            .send(AppEvent::Poll {
                generation,
                event: PollEvent::Failed("Request timed out".to_string()),
            })
            .unwrap();
        app.process_events();

        let Screen::Performance(screen) = &app.screen else {
            panic!("expected performance view");
        };
        assert_eq!(screen.snapshot, Some(MetricsSnapshot::default()));
        assert_eq!(screen.last_error.as_deref(), Some("Request timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimization_appends_history() {
        let mut app = app_with(FakeBackend::default());
        app.set_view(View::Optimization);
        app.select_next();
        app.activate();

        settle().await;
        app.process_events();

        let last = app.history.records().back().unwrap();
        assert_eq!(last.kind, "CSS Minification");
        assert_eq!(last.details, "Optimization completed for css");
        assert_eq!(app.history.records().len(), 3);
        let Screen::Optimization(screen) = &app.screen else {
            panic!("expected optimization view");
        };
        assert!(screen.pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_selected_alert() {
        let mut app = app_with(FakeBackend::default());
        app.set_view(View::Alerts);
        app.cycle_alert_filter();
        assert_eq!(app.selected_alert_id(), Some(1));

        app.activate();
        assert_eq!(app.alerts.active_count(), 0);
        assert_eq!(app.selected_alert_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_save_marks_clean_and_seeds_next_view() {
        let backend = Arc::new(FakeBackend::default());
        let mut app = App::new(backend.clone(), Duration::from_secs(5));
        app.set_view(View::Settings);

        if let Screen::Settings(screen) = &mut app.screen {
            screen.selected = settings_index(SettingsPath::NotificationsSlack);
        }
        app.activate();
        let Screen::Settings(screen) = &app.screen else {
            panic!("expected settings view");
        };
        assert!(screen.store.is_dirty());

        app.save_settings();
        settle().await;
        app.process_events();

        let Screen::Settings(screen) = &app.screen else {
            panic!("expected settings view");
        };
        assert!(!screen.store.is_dirty());
        assert!(!app.saved_settings.notifications.slack);
        assert_eq!(backend.saved.lock().len(), 1);

        app.set_view(View::Alerts);
        app.set_view(View::Settings);
        assert_eq!(
            app.setting_value(SettingsPath::NotificationsSlack),
            Some(SettingValue::Bool(false))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_stays_dirty() {
        let mut app = app_with(FakeBackend {
            fail_save: true,
            ..Default::default()
        });
        app.set_view(View::Settings);
        if let Screen::Settings(screen) = &mut app.screen {
            screen.selected = settings_index(SettingsPath::Theme);
        }
        app.activate();

        app.save_settings();
        settle().await;
        app.process_events();

        let Screen::Settings(screen) = &app.screen else {
            panic!("expected settings view");
        };
        assert!(screen.store.is_dirty());
        assert!(!screen.saving);
        assert_eq!(app.saved_settings, Settings::default());
        assert!(app.get_status_message().unwrap().starts_with("Save failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_edit() {
        let mut app = app_with(FakeBackend::default());
        app.set_view(View::Settings);
        if let Screen::Settings(screen) = &mut app.screen {
            screen.selected = settings_index(SettingsPath::ThresholdsLcp);
        }

        app.activate();
        assert!(app.is_editing());
        for _ in 0..3 {
            app.edit_pop();
        }
        for c in "3.0".chars() {
            app.edit_push(c);
        }
        app.activate();
        assert!(!app.is_editing());
        assert_eq!(app.setting_value(SettingsPath::ThresholdsLcp), Some(SettingValue::Number(3.0)));

        app.activate();
        for c in "abc".chars() {
            app.edit_push(c);
        }
        app.commit_edit();
        assert_eq!(app.setting_value(SettingsPath::ThresholdsLcp), Some(SettingValue::Number(3.0)));
        assert!(app.get_status_message().is_some());
    }
}
