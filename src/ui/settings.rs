//! Settings view rendering.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::{App, SettingsScreen};
use crate::settings::{SettingValue, Settings, SettingsPath, ValueKind};

/// Render the settings form.
pub fn render(frame: &mut Frame, app: &App, screen: &SettingsScreen, area: Rect) {
    let current = screen.store.current();

    let rows: Vec<Row> = SettingsPath::ALL
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let value = if i == screen.selected {
                match &screen.editing {
                    Some(buffer) => Span::styled(
                        format!("{}▏", buffer),
                        Style::default().add_modifier(Modifier::UNDERLINED),
                    ),
                    None => Span::raw(display_value(current, *path)),
                }
            } else {
                Span::raw(display_value(current, *path))
            };

            let hint = match path.kind() {
                ValueKind::Bool => "Enter: toggle",
                ValueKind::Choice => "Enter/⌫: cycle",
                ValueKind::Number => "Enter: edit",
            };

            Row::new(vec![
                Cell::from(path.label()),
                Cell::from(value),
                Cell::from(Span::styled(hint, Style::default().add_modifier(Modifier::DIM))),
            ])
        })
        .collect();

    let title = if screen.saving {
        " Settings (saving…) ".to_string()
    } else if screen.store.is_dirty() {
        " Settings * unsaved changes (s to save) ".to_string()
    } else {
        " Settings ".to_string()
    };

    let table = Table::new(
        rows,
        [Constraint::Length(28), Constraint::Length(16), Constraint::Min(10)],
    )
    .header(Row::new(vec!["Setting", "Value", ""]).style(app.theme.header))
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(if screen.store.is_dirty() {
                Style::default().fg(app.theme.warning)
            } else {
                Style::default().fg(app.theme.border)
            }),
    )
    .row_highlight_style(app.theme.selected);

    let mut state = TableState::default().with_selected(Some(screen.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn display_value(settings: &Settings, path: SettingsPath) -> String {
    match path {
        SettingsPath::Theme => settings.theme.label().to_string(),
        SettingsPath::MonitoringInterval => settings.monitoring.interval.label().to_string(),
        SettingsPath::MonitoringRetention => settings.monitoring.retention.label().to_string(),
        _ => match settings.get(path) {
            SettingValue::Bool(true) => "[x]".to_string(),
            SettingValue::Bool(false) => "[ ]".to_string(),
            other => other.to_string(),
        },
    }
}
