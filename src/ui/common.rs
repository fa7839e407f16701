//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, Screen, View};
use crate::data::duration::format_elapsed;

/// Render the header bar: backend, current score and active alerts.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let score = match &app.screen {
        Screen::Performance(screen) => screen.snapshot.as_ref().and_then(|s| s.latest_score()),
        _ => None,
    }
    .or(app.history.last_score());

    let score_span = match score {
        Some(score) => Span::styled(format!("{:.0}", score), app.theme.score_style(score)),
        None => Span::styled("--", Style::default().add_modifier(Modifier::DIM)),
    };

    let active = app.alerts.active_count();
    let alerts_span = if active > 0 {
        Span::styled(
            format!("{}", active),
            Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("0", Style::default().add_modifier(Modifier::DIM))
    };

    let line = Line::from(vec![
        Span::styled(" PERFWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ score "),
        score_span,
        Span::raw(" │ "),
        alerts_span,
        Span::raw(" active alerts │ "),
        Span::styled(
            app.source_description().to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn tab_title(view: View) -> String {
    format!("{}:{}", view.index() + 1, view.label())
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::ALL.iter().map(|v| Line::from(tab_title(*v))).collect();

    let tabs = Tabs::new(titles)
        .select(app.current_view().index())
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Which tab a click on the tab bar hit.
///
/// Mirrors the `Tabs` layout: one space of padding either side of each
/// title and a one-column divider.
pub fn tab_at(column: u16) -> Option<View> {
    let mut start = 0u16;
    for view in View::ALL {
        let width = tab_title(view).chars().count() as u16 + 2;
        if column < start + width {
            return Some(view);
        }
        start += width + 1;
    }
    None
}

/// Render the status bar at the bottom.
///
/// Temporary status messages win over the per-view controls.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = match &app.screen {
        Screen::Performance(screen) => {
            let freshness = match (&screen.last_error, screen.last_updated) {
                (Some(err), _) => format!("Poll failed: {}", err),
                (None, Some(at)) => format!("Updated {} ago", format_elapsed(at.elapsed())),
                (None, None) => "Waiting for data...".to_string(),
            };
            format!(" {} | r:refresh Tab:switch ?:help q:quit", freshness)
        }
        Screen::Optimization(screen) => match screen.pending {
            Some(kind) => format!(" Running {}... | ?:help q:quit", kind.title()),
            None => " ↑↓:select Enter:run Tab:switch ?:help q:quit".to_string(),
        },
        Screen::Alerts(screen) => format!(
            " {} | f:filter Enter:resolve Tab:switch ?:help q:quit",
            screen.filter.label()
        ),
        Screen::Settings(screen) => {
            if screen.editing.is_some() {
                " Type a number | Enter:apply Esc:cancel".to_string()
            } else if screen.saving {
                " Saving...".to_string()
            } else {
                " ↑↓:select Enter:change s:save Tab:switch ?:help q:quit".to_string()
            }
        }
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ Tab     Switch views"),
        Line::from("  1-4         Jump to view"),
        Line::from("  ↑/↓ j/k     Move selection"),
        Line::from("  Enter       Run / resolve / change"),
        Line::from(""),
        section(" Views"),
        Line::from("  r         Poll metrics now"),
        Line::from("  f         Cycle alert filter"),
        Line::from("  s         Save settings"),
        Line::from("  Backspace Previous choice"),
        Line::from("  Esc       Cancel edit"),
        Line::from(""),
        section(" General"),
        Line::from("  ?         Toggle help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 23u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
