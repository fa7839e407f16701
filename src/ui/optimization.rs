//! Optimization view rendering.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, OptimizationScreen};
use crate::data::{OptimizationKind, OptimizationStatus};

/// Render the Optimization view: actions and status on the left, history on the right.
pub fn render(frame: &mut Frame, app: &App, screen: &OptimizationScreen, area: Rect) {
    let columns =
        Layout::horizontal([Constraint::Length(32), Constraint::Min(30)]).split(area);
    let left = Layout::vertical([Constraint::Length(5), Constraint::Min(5)]).split(columns[0]);

    render_actions(frame, app, screen, left[0]);
    render_status(frame, app, screen, left[1]);
    render_history(frame, app, columns[1]);
}

fn render_actions(frame: &mut Frame, app: &App, screen: &OptimizationScreen, area: Rect) {
    let items: Vec<ListItem> = OptimizationKind::ALL
        .iter()
        .map(|kind| {
            let marker = if screen.pending == Some(*kind) { " …" } else { "" };
            ListItem::new(format!("{}{}", kind.action(), marker))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Quick Actions ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = ListState::default().with_selected(Some(screen.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_status(frame: &mut Frame, app: &App, screen: &OptimizationScreen, area: Rect) {
    let records = app.history.records();
    let completed = records
        .iter()
        .filter(|r| r.status == OptimizationStatus::Completed)
        .count();
    let running = records
        .iter()
        .filter(|r| r.status == OptimizationStatus::InProgress)
        .count()
        + usize::from(screen.pending.is_some());

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Completed   "),
            Span::styled(completed.to_string(), Style::default().fg(app.theme.good)),
        ]),
        Line::from(vec![
            Span::raw("In progress "),
            Span::styled(running.to_string(), Style::default().fg(app.theme.warning)),
        ]),
    ];
    if let Some(score) = app.history.last_score() {
        lines.push(Line::from(vec![
            Span::raw("Score       "),
            Span::styled(format!("{:.0}", score), app.theme.score_style(score)),
        ]));
    }

    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["Type", "Status", "Impact", "Time", "Details"])
        .height(1)
        .style(app.theme.header);

    // Newest first
    let rows: Vec<Row> = app
        .history
        .records()
        .iter()
        .rev()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.kind.clone()),
                Cell::from(Span::styled(r.status.as_str(), app.theme.optimization_style(r.status))),
                Cell::from(r.impact.clone()),
                Cell::from(r.timestamp.clone()),
                Cell::from(r.details.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(17),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(Span::styled(
                " Optimization History ",
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );

    frame.render_widget(table, area);
}
