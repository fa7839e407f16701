//! Alerts view rendering.
//!
//! Filterable alert table on top; statistics, rules and channels below.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{AlertsScreen, App};
use crate::data::AlertRule;

/// Render the Alerts view.
pub fn render(frame: &mut Frame, app: &App, screen: &AlertsScreen, area: Rect) {
    let rows = Layout::vertical([Constraint::Min(6), Constraint::Length(6)]).split(area);
    render_table(frame, app, screen, rows[0]);

    let cards = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(rows[1]);
    render_stats(frame, app, cards[0]);
    render_rules(frame, app, cards[1]);
    render_channels(frame, app, cards[2]);
}

fn render_table(frame: &mut Frame, app: &App, screen: &AlertsScreen, area: Rect) {
    let header = Row::new(vec!["Type", "Severity", "Message", "Time", "Status"])
        .height(1)
        .style(app.theme.header);

    let alerts = app.alerts.filtered(screen.filter);
    let rows: Vec<Row> = alerts
        .iter()
        .map(|a| {
            Row::new(vec![
                Cell::from(a.kind.clone()),
                Cell::from(Span::styled(a.severity.as_str(), app.theme.severity_style(a.severity))),
                Cell::from(a.message.clone()),
                Cell::from(a.timestamp.clone()),
                Cell::from(Span::styled(a.status.as_str(), app.theme.alert_status_style(a.status))),
            ])
        })
        .collect();

    let title = format!(" Alerts [{}] ({}) ", screen.filter.label(), alerts.len());
    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(9),
            Constraint::Min(20),
            Constraint::Length(17),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .row_highlight_style(app.theme.selected);

    let mut state = TableState::default();
    if !alerts.is_empty() {
        state.select(Some(screen.selected.min(alerts.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn card<'a>(app: &App, title: &'a str, lines: Vec<Line<'a>>) -> Paragraph<'a> {
    Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    )
}

fn render_stats(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(vec![
            Span::raw("Active   "),
            Span::styled(
                app.alerts.active_count().to_string(),
                Style::default().fg(app.theme.critical),
            ),
        ]),
        Line::from(vec![
            Span::raw("Resolved "),
            Span::styled(
                app.alerts.resolved_count().to_string(),
                Style::default().fg(app.theme.good),
            ),
        ]),
        Line::from(format!("Total    {}", app.alerts.all().len())),
    ];
    frame.render_widget(card(app, " Alert Statistics ", lines), area);
}

fn render_rules(frame: &mut Frame, app: &App, area: Rect) {
    let lines = AlertRule::from_thresholds(&app.saved_settings.thresholds)
        .iter()
        .map(|rule| Line::from(rule.describe()))
        .collect();
    frame.render_widget(card(app, " Alert Rules ", lines), area);
}

fn render_channels(frame: &mut Frame, app: &App, area: Rect) {
    let notifications = &app.saved_settings.notifications;
    let state = |on: bool| {
        if on {
            Span::styled("on ", Style::default().fg(app.theme.good))
        } else {
            Span::styled("off", Style::default().fg(app.theme.border))
        }
    };
    let lines = vec![
        Line::from(vec![state(notifications.slack), Span::raw(" Slack: #performance-alerts")]),
        Line::from(vec![state(notifications.email), Span::raw(" Email: alerts@example.com")]),
        Line::from(vec![state(notifications.webhook), Span::raw(" Webhook")]),
    ];
    frame.render_widget(card(app, " Notification Channels ", lines), area);
}
