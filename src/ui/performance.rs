//! Performance view rendering.
//!
//! Score gauge and latest values up top, one line chart per metric in the
//! middle, score trend and resource usage at the bottom.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame,
};

use crate::app::{App, PerformanceScreen};
use crate::data::{MetricPoint, MetricsSnapshot};
use crate::ui::Theme;

/// Share of page weight per resource type.
const RESOURCE_USAGE: [(&str, u64); 4] =
    [("Images", 45), ("Scripts", 30), ("Styles", 15), ("Other", 10)];

/// Render the Performance view.
pub fn render(frame: &mut Frame, app: &App, screen: &PerformanceScreen, area: Rect) {
    let Some(snapshot) = &screen.snapshot else {
        render_placeholder(frame, app, screen, area);
        return;
    };

    let error_height = if screen.last_error.is_some() { 1 } else { 0 };
    let chunks = Layout::vertical([
        Constraint::Length(error_height),
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(8),
    ])
    .split(area);

    if let Some(err) = &screen.last_error {
        render_failure(frame, &app.theme, err, chunks[0]);
    }
    render_headline(frame, app, snapshot, chunks[1]);
    render_charts(frame, app, snapshot, chunks[2]);
    render_bottom(frame, app, snapshot, chunks[3]);
}

fn render_placeholder(frame: &mut Frame, app: &App, screen: &PerformanceScreen, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "No data yet",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(Line::from(format!(
        "Polling {} every {}s",
        app.source_description(),
        app.poll_interval().as_secs_f64()
    )));
    if let Some(err) = &screen.last_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Last poll failed: {}", err),
            Style::default().fg(app.theme.critical),
        )));
    }

    let block = Block::default()
        .title(" Performance ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_failure(frame: &mut Frame, theme: &Theme, err: &str, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" ! ", Style::default().fg(theme.critical).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("Poll failed, showing previous data: {}", err),
            Style::default().fg(theme.critical),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_headline(frame: &mut Frame, app: &App, snapshot: &MetricsSnapshot, area: Rect) {
    let chunks =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).split(area);

    let score = snapshot.latest_score().unwrap_or(0.0);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Score ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type),
        )
        .gauge_style(app.theme.score_style(score))
        .ratio((score / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.0}/100", score));
    frame.render_widget(gauge, chunks[0]);

    let thresholds = &app.saved_settings.thresholds;
    let mut spans = vec![Span::raw(" ")];
    for (label, value, limit, unit) in [
        ("LCP", snapshot.latest_lcp(), thresholds.lcp, "s"),
        ("TBT", snapshot.latest_tbt(), thresholds.tbt, "ms"),
        ("INP", snapshot.latest_inp(), thresholds.inp, "ms"),
    ] {
        spans.push(Span::styled(format!("{} ", label), app.theme.header));
        match value {
            Some(v) => spans.push(Span::styled(
                format!("{}{}", format_value(v), unit),
                app.theme.threshold_style(v, limit),
            )),
            None => spans.push(Span::styled("--", Style::default().add_modifier(Modifier::DIM))),
        }
        spans.push(Span::styled(
            format!(" (<{}{})   ", format_value(limit), unit),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    let block = Block::default()
        .title(" Latest ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[1]);
}

fn render_charts(frame: &mut Frame, app: &App, snapshot: &MetricsSnapshot, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    let thresholds = &app.saved_settings.thresholds;
    render_series(frame, app, " LCP (s) ", &snapshot.lcp, thresholds.lcp, chunks[0]);
    render_series(frame, app, " TBT (ms) ", &snapshot.tbt, thresholds.tbt, chunks[1]);
    render_series(frame, app, " INP (ms) ", &snapshot.inp, thresholds.inp, chunks[2]);
}

fn render_series(
    frame: &mut Frame,
    app: &App,
    title: &str,
    series: &[MetricPoint],
    limit: f64,
    area: Rect,
) {
    let points: Vec<(f64, f64)> =
        series.iter().enumerate().map(|(i, p)| (i as f64, p.value)).collect();
    let limit_line = [(0.0, limit), ((series.len().max(2) - 1) as f64, limit)];

    let max_x = (series.len().max(2) - 1) as f64;
    let max_y = series.iter().map(|p| p.value).fold(limit, f64::max) * 1.1;

    let latest_style = series
        .last()
        .map(|p| app.theme.threshold_style(p.value, limit))
        .unwrap_or_default();

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(latest_style)
            .data(&points),
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(app.theme.border))
            .data(&limit_line),
    ];

    let first = series.first().map(|p| p.timestamp.clone()).unwrap_or_default();
    let last = series.last().map(|p| p.timestamp.clone()).unwrap_or_default();

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_type(app.theme.border_type),
        )
        .x_axis(Axis::default().bounds([0.0, max_x]).labels(vec![first, last]))
        .y_axis(
            Axis::default()
                .bounds([0.0, max_y])
                .labels(vec!["0".to_string(), format_value(max_y)]),
        );
    frame.render_widget(chart, area);
}

fn render_bottom(frame: &mut Frame, app: &App, snapshot: &MetricsSnapshot, area: Rect) {
    let chunks =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).split(area);

    let trend: Vec<(String, u64)> = snapshot
        .performance
        .iter()
        .map(|p| (short_label(&p.date), p.score.round() as u64))
        .collect();
    let bars: Vec<(&str, u64)> = trend.iter().map(|(l, v)| (l.as_str(), *v)).collect();

    let trend_chart = BarChart::default()
        .block(
            Block::default()
                .title(" Performance Trend ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type),
        )
        .data(bars.as_slice())
        .bar_width(5)
        .bar_gap(1)
        .max(100)
        .bar_style(Style::default().fg(app.theme.highlight));
    frame.render_widget(trend_chart, chunks[0]);

    let usage = BarChart::default()
        .block(
            Block::default()
                .title(" Resource Usage (%) ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type),
        )
        .data(&RESOURCE_USAGE[..])
        .bar_width(7)
        .bar_gap(1)
        .max(100)
        .bar_style(Style::default().fg(app.theme.warning));
    frame.render_widget(usage, chunks[1]);
}

/// Keep the time part of "YYYY-MM-DD HH:MM:SS" style labels.
fn short_label(date: &str) -> String {
    date.rsplit(' ').next().unwrap_or(date).chars().take(5).collect()
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v).trim_end_matches('0').to_string()
    }
}
