//! Theme configuration for the TUI.
//!
//! The settings view picks light, dark or system; "system" asks the terminal
//! for its background luminance.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{AlertStatus, OptimizationStatus, Severity};
use crate::settings::ThemeChoice;

/// Color and style theme for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Values approaching a threshold, medium alerts.
    pub warning: Color,
    /// Values over a threshold, high alerts.
    pub critical: Color,
    /// Values within thresholds.
    pub good: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            good: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            good: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Theme for the setting the user picked.
    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Light => Self::light(),
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::System => Self::auto_detect(),
        }
    }

    /// Style for a value measured against its threshold.
    ///
    /// Within 80% of the limit is good, up to the limit is a warning.
    pub fn threshold_style(&self, value: f64, limit: f64) -> Style {
        if value > limit {
            Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
        } else if value > limit * 0.8 {
            Style::default().fg(self.warning)
        } else {
            Style::default().fg(self.good)
        }
    }

    /// Style for a 0-100 performance score.
    pub fn score_style(&self, score: f64) -> Style {
        if score >= 90.0 {
            Style::default().fg(self.good)
        } else if score >= 50.0 {
            Style::default().fg(self.warning)
        } else {
            Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
        }
    }

    pub fn severity_style(&self, severity: Severity) -> Style {
        match severity {
            Severity::Low => Style::default().fg(self.highlight),
            Severity::Medium => Style::default().fg(self.warning),
            Severity::High => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
        }
    }

    pub fn alert_status_style(&self, status: AlertStatus) -> Style {
        match status {
            AlertStatus::Active => Style::default().fg(self.critical),
            AlertStatus::Resolved => Style::default().fg(self.good),
        }
    }

    pub fn optimization_style(&self, status: OptimizationStatus) -> Style {
        match status {
            OptimizationStatus::Completed => Style::default().fg(self.good),
            OptimizationStatus::InProgress => Style::default().fg(self.warning),
            OptimizationStatus::Failed => Style::default().fg(self.critical),
        }
    }
}
